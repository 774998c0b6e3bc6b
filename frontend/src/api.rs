use gloo_net::http::Request;
use hardy_core::NewsItem;

/// Base URL of the backend API server.
const API_BASE: &str = "http://localhost:8080";

/// Token presented to the chat relay. The relay accepts any bearer unless
/// the server pins one with `CHAT_RELAY_TOKEN`.
pub const CHAT_TOKEN: &str = "hardy-portal-anon";

pub fn chat_url() -> String {
    format!("{API_BASE}/api/chat")
}

/// Returns the WebSocket URL of the change feed for `table`.
pub fn changes_ws_url(table: &str) -> String {
    let ws_base = API_BASE.replacen("http", "ws", 1);
    format!("{ws_base}/ws/changes?table={table}")
}

/// Fetches the most recent news, newest first.
pub async fn fetch_news(limit: u32) -> Result<Vec<NewsItem>, String> {
    let resp = Request::get(&format!("{API_BASE}/api/news?limit={limit}"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    resp.json::<Vec<NewsItem>>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}
