mod config;
mod db;
mod errors;
mod mail;
mod models;
mod relay;
mod routes;
mod service;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use hardy_core::reference::ReferenceLibrary;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::news_repository::NewsRepository;
use crate::mail::Mailer;
use crate::relay::ChatRelay;
use crate::service::auth_email::AuthEmailService;
use crate::service::change_feed::ChangeFeed;
use crate::service::news_service::NewsService;
use crate::service::server_stats::ServerStatsProbe;
use crate::state::AppState;

const CHANGE_FEED_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hardy_portal=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database connection established and migrations applied");

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let library = load_reference_library(config.reference_data_path.as_deref())?;
    let http = reqwest::Client::new();
    let feed = ChangeFeed::new(CHANGE_FEED_CAPACITY);

    let relay = ChatRelay::new(
        http.clone(),
        config.ai_gateway_url.clone(),
        config.ai_api_key.clone(),
        config.ai_model.clone(),
    );
    if config.ai_api_key.is_none() {
        warn!("AI_API_KEY is not set, /api/chat will answer 500");
    }

    let mailer = Mailer::new(
        http.clone(),
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
    );
    let auth_email =
        AuthEmailService::new(config.auth_hook_secret.clone(), config.auth_base_url.clone(), mailer);
    let stats = ServerStatsProbe::new(http, config.server_stats_url.clone(), config.server_stats_timeout);

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        relay,
        news: NewsService::new(NewsRepository::new(pool), feed.clone()),
        auth_email,
        feed,
        library: Arc::new(library),
        stats,
    };

    // ── Router ────────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = routes::router(state).layer(TraceLayer::new_for_http()).layer(cors);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn load_reference_library(path: Option<&str>) -> anyhow::Result<ReferenceLibrary> {
    let Some(path) = path else {
        warn!("REFERENCE_DATA_PATH is not set, reference library is empty");
        return Ok(ReferenceLibrary::default());
    };
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Reference data {path} not found, reference library is empty");
            return Ok(ReferenceLibrary::default());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read reference data from {path}")),
    };
    let library = ReferenceLibrary::from_json(&json)
        .with_context(|| format!("Invalid reference data in {path}"))?;
    info!("Loaded {} reference articles from {path}", library.len());
    Ok(library)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
