pub mod api_routes;
pub mod webhook_routes;
pub mod ws_routes;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api_routes::health_handler))
        .route("/api/chat", post(api_routes::chat_handler))
        .route("/api/news", get(api_routes::list_news_handler))
        .route("/api/news/unread", get(api_routes::unread_news_handler))
        .route("/api/codes", get(api_routes::codes_handler))
        .route("/api/penalty", post(api_routes::penalty_handler))
        .route("/api/server-stats", get(api_routes::server_stats_handler))
        .route("/api/webhooks/news", post(webhook_routes::news_webhook_handler))
        .route("/api/hooks/auth-email", post(webhook_routes::auth_email_hook_handler))
        .route("/ws/changes", get(ws_routes::ws_changes_handler))
        .with_state(state)
}
