use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::mail::signature::{decode_secret, verify, SignedDelivery};
use crate::mail::templates::{render, verification_link, EmailAction};
use crate::mail::Mailer;
use crate::models::AuthEmailPayload;

/// Handles the auth provider's "send email" hook: verify, render, deliver.
#[derive(Clone)]
pub struct AuthEmailService {
    hook_secret: Option<String>,
    auth_base_url: String,
    mailer: Mailer,
}

impl AuthEmailService {
    pub fn new(hook_secret: Option<String>, auth_base_url: impl Into<String>, mailer: Mailer) -> Self {
        Self { hook_secret, auth_base_url: auth_base_url.into(), mailer }
    }

    pub async fn handle(&self, delivery: &SignedDelivery<'_>, body: &[u8]) -> Result<(), AppError> {
        let secret = self
            .hook_secret
            .as_deref()
            .ok_or_else(|| AppError::InvalidSignature("hook secret is not configured".to_string()))?;
        let key = decode_secret(secret)?;
        verify(&key, delivery, body, Utc::now()).inspect_err(|e| {
            warn!("rejected auth email hook delivery {}: {e}", delivery.id);
        })?;

        let payload: AuthEmailPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid hook payload: {e}")))?;
        let data = &payload.email_data;

        let action = EmailAction::parse(&data.email_action_type);
        let link = verification_link(&self.auth_base_url, data)?;
        let email = render(&action, &link, &data.token)?;

        self.mailer.send(&payload.user.email, &email).await?;
        info!("auth email '{}' delivered for hook {}", data.email_action_type, delivery.id);
        Ok(())
    }
}
