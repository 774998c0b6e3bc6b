use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use hardy_core::ChangeEvent;
use serde::Deserialize;
use tracing::{info, warn};

use crate::service::change_feed::ChangeSubscription;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub table: Option<String>,
}

/// GET `/ws/changes?table=news` — upgrades to a WebSocket that pushes
/// `ChangeEvent`s as JSON text frames.
pub async fn ws_changes_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> impl IntoResponse {
    let subscription = state.feed.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, subscription, query.table))
}

/// Forwards matching events until either side goes away. Anything the client
/// sends besides a close frame is ignored.
async fn handle_socket(mut socket: WebSocket, mut subscription: ChangeSubscription, table: Option<String>) {
    let table = table.unwrap_or_else(|| "*".to_string());
    info!("change feed client subscribed to '{table}'");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                if table != "*" && !event.concerns(&table) {
                    continue;
                }
                if !send_event(&mut socket, &event).await {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            },
        }
    }

    info!("change feed client for '{table}' disconnected");
}

/// Serializes an event and sends it; `false` once the socket is unusable.
async fn send_event(socket: &mut WebSocket, event: &ChangeEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("failed to serialize change event: {e}");
            true
        }
    }
}
