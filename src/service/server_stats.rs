use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::ServerStats;

/// Shape returned by the game server's stats endpoint. Field names vary
/// between server builds, hence the aliases.
#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(default = "default_online")]
    online: bool,
    #[serde(default, alias = "clients", alias = "playerCount")]
    players: u32,
    #[serde(default, alias = "maxPlayers", alias = "sv_maxclients")]
    max_players: u32,
}

fn default_online() -> bool {
    true
}

/// Polls the game server with a hard deadline; any failure reads as offline.
#[derive(Clone)]
pub struct ServerStatsProbe {
    http: reqwest::Client,
    url: Option<String>,
    timeout: Duration,
}

impl ServerStatsProbe {
    pub fn new(http: reqwest::Client, url: Option<String>, timeout: Duration) -> Self {
        Self { http, url, timeout }
    }

    pub async fn fetch(&self) -> ServerStats {
        let Some(url) = self.url.as_deref() else {
            return ServerStats::offline();
        };
        match tokio::time::timeout(self.timeout, self.request(url)).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                warn!("server stats unavailable: {e}");
                ServerStats::offline()
            }
            Err(_) => {
                warn!("server stats timed out after {:?}", self.timeout);
                ServerStats::offline()
            }
        }
    }

    async fn request(&self, url: &str) -> Result<ServerStats, reqwest::Error> {
        let raw: RawStats = self.http.get(url).send().await?.error_for_status()?.json().await?;
        debug!(?raw, "server stats fetched");
        Ok(ServerStats { online: raw.online, players: raw.players, max_players: raw.max_players })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/stats")
    }

    fn probe(url: String, timeout_ms: u64) -> ServerStatsProbe {
        ServerStatsProbe::new(reqwest::Client::new(), Some(url), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn reads_camel_case_stats() {
        let url = serve(Router::new().route(
            "/stats",
            get(|| async { r#"{"players":42,"maxPlayers":128}"# }),
        ))
        .await;
        let stats = probe(url, 1_000).fetch().await;
        assert_eq!(stats, ServerStats { online: true, players: 42, max_players: 128 });
    }

    #[tokio::test]
    async fn slow_server_reads_as_offline() {
        let url = serve(Router::new().route(
            "/stats",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                r#"{"players":1,"max_players":2}"#
            }),
        ))
        .await;
        assert_eq!(probe(url, 50).fetch().await, ServerStats::offline());
    }

    #[tokio::test]
    async fn error_status_and_garbage_read_as_offline() {
        let failing = serve(Router::new().route("/stats", get(|| async { StatusCode::BAD_GATEWAY }))).await;
        assert_eq!(probe(failing, 1_000).fetch().await, ServerStats::offline());

        let garbage = serve(Router::new().route("/stats", get(|| async { "<html>" }))).await;
        assert_eq!(probe(garbage, 1_000).fetch().await, ServerStats::offline());
    }

    #[tokio::test]
    async fn unconfigured_probe_is_offline() {
        let probe = ServerStatsProbe::new(reqwest::Client::new(), None, Duration::from_secs(1));
        assert_eq!(probe.fetch().await, ServerStats::offline());
    }
}
