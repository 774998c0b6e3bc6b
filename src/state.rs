use std::sync::Arc;

use hardy_core::reference::ReferenceLibrary;

use crate::config::Config;
use crate::relay::ChatRelay;
use crate::service::auth_email::AuthEmailService;
use crate::service::change_feed::ChangeFeed;
use crate::service::news_service::NewsService;
use crate::service::server_stats::ServerStatsProbe;

/// Everything handlers need, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: ChatRelay,
    pub news: NewsService,
    pub auth_email: AuthEmailService,
    pub feed: ChangeFeed,
    pub library: Arc<ReferenceLibrary>,
    pub stats: ServerStatsProbe,
}

#[cfg(test)]
impl AppState {
    /// State wired to in-process fakes: no database, no upstream services.
    pub(crate) fn for_tests(news: NewsService, feed: ChangeFeed, news_webhook_secret: Option<&str>) -> Self {
        use std::time::Duration;

        use crate::mail::Mailer;

        let config = Config {
            port: 0,
            database_url: String::new(),
            ai_gateway_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ai_api_key: None,
            ai_model: "test-model".to_string(),
            chat_relay_token: None,
            news_webhook_secret: news_webhook_secret.map(str::to_owned),
            auth_hook_secret: None,
            auth_base_url: "http://127.0.0.1:9".to_string(),
            email_api_url: "http://127.0.0.1:9/emails".to_string(),
            email_api_key: None,
            email_from: "test@hardy.local".to_string(),
            server_stats_url: None,
            server_stats_timeout: Duration::from_millis(100),
            reference_data_path: None,
        };
        let http = reqwest::Client::new();
        let mailer = Mailer::new(http.clone(), &config.email_api_url, None, &config.email_from);

        Self {
            relay: ChatRelay::new(http.clone(), &config.ai_gateway_url, None, &config.ai_model),
            news,
            auth_email: AuthEmailService::new(None, &config.auth_base_url, mailer),
            feed,
            library: Arc::new(ReferenceLibrary::default()),
            stats: ServerStatsProbe::new(http, None, config.server_stats_timeout),
            config: Arc::new(config),
        }
    }
}
