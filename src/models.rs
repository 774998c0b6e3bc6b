use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized news row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNews {
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub image_url: Option<String>,
    pub discord_message_id: Option<String>,
}

/// Result of feeding one webhook payload through ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created { id: Uuid },
    Duplicate,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<IngestOutcome> for WebhookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Created { id } => {
                Self { success: true, id: Some(id), skipped: None, reason: None }
            }
            IngestOutcome::Duplicate => Self {
                success: true,
                id: None,
                skipped: Some(true),
                reason: Some("duplicate"),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UnreadQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

#[derive(Debug, Deserialize)]
pub struct CodesQuery {
    pub code: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PenaltyRequest {
    pub article_ids: Vec<String>,
}

/// Online status of the game server as shown in the portal header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub online: bool,
    pub players: u32,
    pub max_players: u32,
}

impl ServerStats {
    pub fn offline() -> Self {
        Self { online: false, players: 0, max_players: 0 }
    }
}

/// Payload the auth provider posts to the send-email hook.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthEmailPayload {
    pub user: AuthUser,
    pub email_data: EmailData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailData {
    pub token: String,
    pub token_hash: String,
    #[serde(default)]
    pub redirect_to: String,
    pub email_action_type: String,
    #[serde(default)]
    pub site_url: String,
}
