use hardy_core::{ChatMessage, MAX_MESSAGE_BYTES, MAX_RELAY_MESSAGES};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error};

use crate::errors::AppError;

const SYSTEM_PROMPT: &str = "Ты юридический ассистент ролевого проекта HARDY. \
                             Отвечай на вопросы об уголовном, административном, \
                             дорожном и процессуальном кодексах сервера. \
                             Ссылайся на номера статей, будь краток и точен. \
                             Если не знаешь ответа, так и скажи.";

#[derive(Serialize)]
struct ProviderMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ProviderRequest<'a> {
    model: &'a str,
    messages: Vec<ProviderMessage<'a>>,
    stream: bool,
}

/// Builds the provider message list: system prompt first, then the
/// conversation as the client sent it.
fn to_provider_messages(history: &[ChatMessage]) -> Vec<ProviderMessage<'_>> {
    std::iter::once(ProviderMessage { role: "system", content: SYSTEM_PROMPT })
        .chain(history.iter().map(|m| ProviderMessage {
            role: m.role.as_str(),
            content: &m.content,
        }))
        .collect()
}

/// Forwards a conversation to an OpenAI-compatible chat completions endpoint
/// and hands back the streaming response untouched.
#[derive(Clone)]
pub struct ChatRelay {
    http: reqwest::Client,
    gateway_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatRelay {
    pub fn new(
        http: reqwest::Client,
        gateway_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { http, gateway_url: gateway_url.into(), api_key, model: model.into() }
    }

    pub fn validate(messages: &[ChatMessage]) -> Result<(), AppError> {
        if messages.is_empty() {
            return Err(AppError::EmptyField { field_name: "messages".to_string() });
        }
        if messages.len() > MAX_RELAY_MESSAGES {
            return Err(AppError::FieldTooLong {
                field_name: "messages".to_string(),
                max_length: MAX_RELAY_MESSAGES,
                actual_length: messages.len(),
            });
        }
        for message in messages {
            if message.content.trim().is_empty() {
                return Err(AppError::EmptyField { field_name: "content".to_string() });
            }
            if message.content.len() > MAX_MESSAGE_BYTES {
                return Err(AppError::FieldTooLong {
                    field_name: "content".to_string(),
                    max_length: MAX_MESSAGE_BYTES,
                    actual_length: message.content.len(),
                });
            }
        }
        Ok(())
    }

    /// Sends the conversation upstream with `stream: true`. A success
    /// response is returned unread so its body can be relayed chunk by chunk.
    pub async fn open(&self, messages: &[ChatMessage]) -> Result<reqwest::Response, AppError> {
        Self::validate(messages)?;
        let api_key = self.api_key.as_deref().ok_or(AppError::RelayNotConfigured)?;

        let body = ProviderRequest {
            model: &self.model,
            messages: to_provider_messages(messages),
            stream: true,
        };
        debug!(model = %self.model, turns = messages.len(), "opening chat stream");

        let response = self
            .http
            .post(&self.gateway_url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("AI gateway unreachable at {}: {e}", self.gateway_url);
                AppError::Http(e)
            })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(AppError::UpstreamRateLimited),
            StatusCode::PAYMENT_REQUIRED => Err(AppError::UpstreamPaymentRequired),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("AI gateway returned {status}: {body}");
                Err(AppError::UpstreamFailed { status: status.as_u16(), body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use hardy_core::consume_stream;
    use serde_json::Value;

    use super::*;

    const SSE_BODY: &str = ": keep-alive\n\
                            data: {\"choices\":[{\"delta\":{\"content\":\"Статья \"}}]}\n\n\
                            data: {\"choices\":[{\"delta\":{\"content\":\"12.1\"}}]}\n\n\
                            data: [DONE]\n\n";

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    async fn provider_with_status(status: AxumStatus) -> SocketAddr {
        serve(Router::new().route("/v1/chat/completions", post(move || async move { (status, "{}") })))
            .await
    }

    fn relay(addr: SocketAddr) -> ChatRelay {
        ChatRelay::new(
            reqwest::Client::new(),
            format!("http://{addr}/v1/chat/completions"),
            Some("test-key".to_string()),
            "test-model",
        )
    }

    #[tokio::test]
    async fn relays_stream_with_system_prompt() {
        let captured = Arc::new(Mutex::new(None::<Value>));
        let sink = captured.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    SSE_BODY
                }
            }),
        );
        let addr = serve(app).await;

        let response = relay(addr).open(&[ChatMessage::user("Что за угон?")]).await.unwrap();
        let mut text = String::new();
        let mut done = false;
        consume_stream(
            Ok(response.bytes_stream()),
            |delta| text.push_str(&delta),
            || done = true,
            |err| panic!("unexpected stream error: {err}"),
        )
        .await;

        assert!(done);
        assert_eq!(text, "Статья 12.1");

        let sent = captured.lock().unwrap().clone().unwrap();
        assert_eq!(sent["stream"], true);
        assert_eq!(sent["model"], "test-model");
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "Что за угон?");
    }

    #[tokio::test]
    async fn maps_rate_limit_and_payment_statuses() {
        let limited = provider_with_status(AxumStatus::TOO_MANY_REQUESTS).await;
        let err = relay(limited).open(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamRateLimited));

        let unpaid = provider_with_status(AxumStatus::PAYMENT_REQUIRED).await;
        let err = relay(unpaid).open(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamPaymentRequired));

        let broken = provider_with_status(AxumStatus::BAD_GATEWAY).await;
        let err = relay(broken).open(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailed { status: 502, .. }));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let relay = ChatRelay::new(reqwest::Client::new(), "http://127.0.0.1:9", None, "m");
        let err = relay.open(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, AppError::RelayNotConfigured));
    }

    #[test]
    fn validation_rules() {
        assert!(ChatRelay::validate(&[]).is_err());
        assert!(ChatRelay::validate(&[ChatMessage::user("  ")]).is_err());
        assert!(ChatRelay::validate(&[ChatMessage::user("x".repeat(8001))]).is_err());
        let many: Vec<_> = (0..51).map(|i| ChatMessage::user(format!("m{i}"))).collect();
        assert!(ChatRelay::validate(&many).is_err());
        assert!(ChatRelay::validate(&[ChatMessage::user("ok"), ChatMessage::assistant("fine")]).is_ok());
    }

    #[test]
    fn stored_history_always_passes_validation() {
        use hardy_core::{ConversationStore, MemoryStorage};

        let mut store = ConversationStore::load(MemoryStorage::new());
        for i in 0..30 {
            store.push_user(format!("вопрос {i}"));
            store.apply_delta(&"д".repeat(4001));
            store.finish_response();
        }
        store.push_user("ещё вопрос");
        assert!(ChatRelay::validate(&store.history()).is_ok());
    }
}
