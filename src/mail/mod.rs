//! Transactional email: signature checks for the auth hook, HTML templates,
//! and delivery through a JSON email API.

pub mod signature;
pub mod templates;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::{error, info};

use crate::errors::AppError;
use templates::RenderedEmail;

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
    ) -> Self {
        Self { http, api_url: api_url.into(), api_key, from: from.into() }
    }

    pub async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::EmailDelivery("email API key is not configured".to_string()))?;

        let body = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject: &email.subject,
            html: &email.html,
        };
        let response = self
            .http
            .post(&self.api_url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::EmailDelivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("email API returned {status}: {detail}");
            return Err(AppError::EmailDelivery(format!("email API returned {status}")));
        }
        info!("sent '{}' to {to}", email.subject);
        Ok(())
    }
}
