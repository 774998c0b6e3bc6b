use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Most messages the chat relay accepts in one request.
pub const MAX_RELAY_MESSAGES: usize = 50;

/// Longest message content, in bytes, the chat relay accepts.
pub const MAX_MESSAGE_BYTES: usize = 8000;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRelayRequest {
    pub messages: Vec<ChatMessage>,
}

/// A row of the `news` table as served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub image_url: Option<String>,
    pub discord_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The subscriber fell behind and missed events; re-fetch everything.
    Resync,
}

/// Row-change notification pushed over the change feed.
///
/// Delivery is at-least-once and unordered across rows, so consumers should
/// treat every event as "something in `table` changed" and re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind, row_id: Option<String>) -> Self {
        Self { table: table.into(), kind, row_id }
    }

    pub fn resync() -> Self {
        Self { table: "*".to_string(), kind: ChangeKind::Resync, row_id: None }
    }

    /// Whether a subscriber interested in `table` should react to this event.
    pub fn concerns(&self, table: &str) -> bool {
        self.kind == ChangeKind::Resync || self.table == table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn resync_concerns_every_table() {
        assert!(ChangeEvent::resync().concerns("news"));
        let ev = ChangeEvent::new("media", ChangeKind::Insert, None);
        assert!(!ev.concerns("news"));
        assert!(ev.concerns("media"));
    }
}
