use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hardy_core::reference::{Article, CodeKind, PenaltySummary};
use hardy_core::{ChatRelayRequest, NewsItem};
use tracing::debug;

use crate::errors::AppError;
use crate::models::{CodesQuery, NewsQuery, PenaltyRequest, ServerStats, UnreadQuery, UnreadResponse};
use crate::state::AppState;

// ── Chat relay ───────────────────────────────────────────────────────────────

/// Extracts the bearer token; `None` when the header is missing or is not a
/// bearer credential.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authorize_chat(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    match expected {
        Some(expected) if token != expected => Err(AppError::Unauthorized),
        _ => Ok(()),
    }
}

/// POST `/api/chat` — forwards the conversation upstream and relays the SSE
/// body back unchanged.
pub async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    authorize_chat(&headers, state.config.chat_relay_token.as_deref())?;

    let request: ChatRelayRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;

    let upstream = state.relay.open(&request.messages).await?;
    debug!("relaying chat stream for {} message(s)", request.messages.len());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

// ── News ─────────────────────────────────────────────────────────────────────

/// GET `/api/news?limit=`
pub async fn list_news_handler(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<NewsItem>>, AppError> {
    Ok(Json(state.news.list(query.limit).await?))
}

/// GET `/api/news/unread?since=`
pub async fn unread_news_handler(
    State(state): State<AppState>,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<UnreadResponse>, AppError> {
    let unread = state.news.unread_count(query.since).await?;
    Ok(Json(UnreadResponse { unread }))
}

// ── Reference ────────────────────────────────────────────────────────────────

/// GET `/api/codes?code=&q=`
pub async fn codes_handler(
    State(state): State<AppState>,
    Query(query): Query<CodesQuery>,
) -> Result<Json<Vec<Article>>, AppError> {
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<CodeKind>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let articles = state.library.search(code, query.q.as_deref()).into_iter().cloned().collect();
    Ok(Json(articles))
}

/// POST `/api/penalty`
pub async fn penalty_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PenaltySummary>, AppError> {
    let request: PenaltyRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;
    let summary = state
        .library
        .penalty(&request.article_ids)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(summary))
}

// ── Server stats ─────────────────────────────────────────────────────────────

/// GET `/api/server-stats` — never fails; an unreachable server reads offline.
pub async fn server_stats_handler(State(state): State<AppState>) -> Json<ServerStats> {
    Json(state.stats.fetch().await)
}

/// GET `/health`
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = auth {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn chat_requires_a_bearer_token() {
        assert!(matches!(authorize_chat(&headers(None), None), Err(AppError::Unauthorized)));
        assert!(authorize_chat(&headers(Some("Basic abc")), None).is_err());
        assert!(authorize_chat(&headers(Some("Bearer ")), None).is_err());
        assert!(authorize_chat(&headers(Some("Bearer anon-key")), None).is_ok());
    }

    #[test]
    fn configured_token_must_match() {
        assert!(authorize_chat(&headers(Some("Bearer right")), Some("right")).is_ok());
        assert!(authorize_chat(&headers(Some("Bearer wrong")), Some("right")).is_err());
    }
}
