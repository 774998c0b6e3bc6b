use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::errors::AppError;
use crate::mail::signature::SignedDelivery;
use crate::models::WebhookResponse;
use crate::state::AppState;

const SECRET_HEADER: &str = "x-webhook-secret";

/// Constant-time comparison of the presented secret against the configured
/// one. No configured secret rejects everything.
fn secret_matches(presented: Option<&str>, configured: Option<&str>) -> bool {
    match (presented, configured) {
        (Some(presented), Some(configured)) if !configured.is_empty() => {
            let (a, b) = (presented.as_bytes(), configured.as_bytes());
            a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
        }
        _ => false,
    }
}

/// POST `/api/webhooks/news` — ingests a news post relayed from Discord or
/// posted directly.
pub async fn news_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(presented, state.config.news_webhook_secret.as_deref()) {
        warn!("news webhook called with a missing or wrong secret");
        return Err(AppError::Unauthorized);
    }

    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;
    let outcome = state.news.ingest(&payload).await?;
    Ok(Json(outcome.into()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

/// POST `/api/hooks/auth-email` — renders and sends auth emails on behalf of
/// the auth service. Failures use the hook protocol's error envelope.
pub async fn auth_email_hook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = SignedDelivery {
        id: header(&headers, "webhook-id"),
        timestamp: header(&headers, "webhook-timestamp"),
        signatures: header(&headers, "webhook-signature"),
    };

    match state.auth_email.handle(&delivery, &body).await {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => {
            error!("auth email hook failed: {e}");
            hook_error(&e)
        }
    }
}

fn hook_error(err: &AppError) -> Response {
    let status = StatusCode::UNAUTHORIZED;
    let body = json!({ "error": { "http_code": status.as_u16(), "message": err.to_string() } });
    (status, Json(body)).into_response()
}
