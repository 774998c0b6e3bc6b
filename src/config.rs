//! Service configuration, read from the environment once at startup.

use std::time::Duration;

use anyhow::Context;

const DEFAULT_AI_GATEWAY_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_STATS_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,

    /// OpenAI-compatible chat completions endpoint the relay forwards to.
    pub ai_gateway_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    /// Bearer token callers of `/api/chat` must present. Unset = any bearer.
    pub chat_relay_token: Option<String>,

    /// Shared secret for the news webhook. Unset = every request rejected.
    pub news_webhook_secret: Option<String>,
    /// `v1,whsec_<base64>` secret of the auth email hook.
    pub auth_hook_secret: Option<String>,
    /// Base URL of the auth service, used to build verification links.
    pub auth_base_url: String,

    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,

    pub server_stats_url: Option<String>,
    pub server_stats_timeout: Duration,

    pub reference_data_path: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set (copy .env.example to .env)")?;

        Ok(Self {
            port: parse_env("PORT", 8080),
            database_url,
            ai_gateway_url: env_or("AI_GATEWAY_URL", DEFAULT_AI_GATEWAY_URL),
            ai_api_key: env_opt("AI_API_KEY"),
            ai_model: env_or("AI_MODEL", DEFAULT_AI_MODEL),
            chat_relay_token: env_opt("CHAT_RELAY_TOKEN"),
            news_webhook_secret: env_opt("NEWS_WEBHOOK_SECRET"),
            auth_hook_secret: env_opt("SEND_EMAIL_HOOK_SECRET"),
            auth_base_url: env_or("AUTH_BASE_URL", "http://localhost:54321"),
            email_api_url: env_or("EMAIL_API_URL", "https://api.resend.com/emails"),
            email_api_key: env_opt("EMAIL_API_KEY"),
            email_from: env_or("EMAIL_FROM", "HARDY Portal <noreply@hardy.local>"),
            server_stats_url: env_opt("SERVER_STATS_URL"),
            server_stats_timeout: Duration::from_millis(parse_env(
                "SERVER_STATS_TIMEOUT_MS",
                DEFAULT_STATS_TIMEOUT_MS,
            )),
            reference_data_path: env_opt("REFERENCE_DATA_PATH"),
        })
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
