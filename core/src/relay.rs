use std::fmt::Display;

use futures_util::{pin_mut, Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::stream::FrameDecoder;

/// Why a chat stream could not be delivered in full.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Non-success status; `message` is the upstream `{ "error": ... }` text
    /// when there was one.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("response has no readable body")]
    MissingBody,

    #[error("connection failed: {0}")]
    Transport(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl StreamError {
    /// Builds the error for a non-success response from its status and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        StreamError::Upstream { status, message }
    }

    pub fn transport(err: impl Display) -> Self {
        StreamError::Transport(err.to_string())
    }
}

/// Drives an opened chat response to completion.
///
/// `opened` is the outcome of the initial request: the body stream on
/// success, or the error to report. Deltas go to `on_delta` in stream order.
/// Exactly one of `on_done` / `on_error` is called afterwards. Deltas already
/// delivered before a transport failure are not retracted.
pub async fn consume_stream<S, B, E>(
    opened: Result<S, StreamError>,
    mut on_delta: impl FnMut(String),
    on_done: impl FnOnce(),
    on_error: impl FnOnce(StreamError),
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let body = match opened {
        Ok(body) => body,
        Err(err) => {
            warn!("chat stream failed to open: {err}");
            on_error(err);
            return;
        }
    };
    pin_mut!(body);

    let mut decoder = FrameDecoder::new();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("chat stream read failed: {err}");
                on_error(StreamError::transport(err));
                return;
            }
        };
        for delta in decoder.push(chunk.as_ref()) {
            on_delta(delta);
        }
        if decoder.is_finished() {
            debug!("stream sentinel received, closing read loop");
            break;
        }
    }

    for delta in decoder.finish() {
        on_delta(delta);
    }
    on_done();
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    type Chunk = Result<Vec<u8>, String>;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Chunk> {
        stream::iter(parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect::<Vec<_>>())
    }

    #[derive(Default)]
    struct Outcome {
        deltas: Vec<String>,
        done: usize,
        errors: Vec<StreamError>,
    }

    async fn run<S: Stream<Item = Chunk>>(opened: Result<S, StreamError>) -> Outcome {
        let mut deltas = Vec::new();
        let mut done = 0;
        let mut errors = Vec::new();
        consume_stream(opened, |d| deltas.push(d), || done += 1, |e| errors.push(e)).await;
        Outcome { deltas, done, errors }
    }

    #[tokio::test]
    async fn delivers_deltas_then_done() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);
        let out = run(Ok(body)).await;
        assert_eq!(out.deltas, vec!["hi"]);
        assert_eq!(out.done, 1);
        assert!(out.errors.is_empty());
    }

    #[tokio::test]
    async fn split_frame_is_delivered_once() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"conte",
            "nt\":\"hi\"}}]}\n\n",
        ]);
        let out = run(Ok(body)).await;
        assert_eq!(out.deltas, vec!["hi"]);
        assert_eq!(out.done, 1);
    }

    #[tokio::test]
    async fn stops_reading_after_sentinel() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        let out = run(Ok(body)).await;
        assert_eq!(out.deltas, vec!["a"]);
        assert_eq!(out.done, 1);
    }

    #[tokio::test]
    async fn open_failure_reports_error_only() {
        let opened: Result<stream::Empty<Chunk>, _> =
            Err(StreamError::from_response(429, r#"{"error":"Rate limit exceeded"}"#));
        let out = run(opened).await;
        assert!(out.deltas.is_empty());
        assert_eq!(out.done, 0);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].to_string(), "Rate limit exceeded");
    }

    #[tokio::test]
    async fn transport_failure_keeps_earlier_deltas() {
        let body = stream::iter(vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"part\"}}]}\n".to_vec()),
            Err("connection reset".to_string()),
        ]);
        let out = run(Ok(body)).await;
        assert_eq!(out.deltas, vec!["part"]);
        assert_eq!(out.done, 0);
        assert_eq!(out.errors, vec![StreamError::Transport("connection reset".into())]);
    }

    #[tokio::test]
    async fn stream_without_sentinel_still_completes() {
        let body = chunks(&["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"]);
        let out = run(Ok(body)).await;
        assert_eq!(out.deltas, vec!["x"]);
        assert_eq!(out.done, 1);
    }

    #[test]
    fn error_body_without_json_falls_back_to_status() {
        let err = StreamError::from_response(502, "<html>Bad gateway</html>");
        assert_eq!(err.to_string(), "Request failed with status 502");
        assert!(matches!(err, StreamError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn missing_body_surfaces_as_chat_error() {
        use crate::{ConversationStore, MemoryStorage};

        let mut store = ConversationStore::load(MemoryStorage::new());
        store.push_user("вопрос");

        let opened: Result<stream::Empty<Chunk>, _> = Err(StreamError::MissingBody);
        let mut failure = None;
        consume_stream(opened, |d| store.apply_delta(&d), || {}, |e| failure = Some(e)).await;

        let err = failure.expect("error callback must fire");
        assert_eq!(err, StreamError::MissingBody);
        store.fail_response(&err.to_string());
        assert_eq!(store.messages()[1].content, "❌ response has no readable body");
    }
}
