//! Client side of the chat relay: POST the history, then feed the response
//! body through `hardy_core::consume_stream`.

use futures_util::Stream;
use futures_util::stream;
use gloo_net::http::Request;
use hardy_core::{ChatMessage, ChatRelayRequest, StreamError, consume_stream};
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader};

use crate::api::{CHAT_TOKEN, chat_url};

type Chunk = Result<Vec<u8>, String>;

/// Adapts a `ReadableStream` of `Uint8Array`s into a byte-chunk stream. The
/// stream ends on `done` or after the first read error.
fn body_chunks(body: ReadableStream) -> impl Stream<Item = Chunk> {
    let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();
    stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match JsFuture::from(reader.read()).await {
            Ok(result) => {
                let done = Reflect::get(&result, &JsValue::from_str("done"))
                    .ok()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true);
                if done {
                    return None;
                }
                let bytes = Reflect::get(&result, &JsValue::from_str("value"))
                    .ok()
                    .and_then(|v| v.dyn_into::<Uint8Array>().ok())
                    .map(|array| array.to_vec())
                    .unwrap_or_default();
                Some((Ok(bytes), Some(reader)))
            }
            Err(e) => Some((Err(format!("{e:?}")), None)),
        }
    })
}

/// Opens the relay request. Non-success responses are turned into the
/// upstream error message.
async fn open(history: Vec<ChatMessage>) -> Result<impl Stream<Item = Chunk>, StreamError> {
    let request = ChatRelayRequest { messages: history };
    let resp = Request::post(&chat_url())
        .header("Authorization", &format!("Bearer {CHAT_TOKEN}"))
        .json(&request)
        .map_err(StreamError::transport)?
        .send()
        .await
        .map_err(StreamError::transport)?;

    if !resp.ok() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StreamError::from_response(resp.status(), &body));
    }

    let body = resp.body().ok_or(StreamError::MissingBody)?;
    Ok(body_chunks(body))
}

/// Sends `history` to the relay and reports the reply through the callbacks.
pub async fn stream_chat(
    history: Vec<ChatMessage>,
    on_delta: impl FnMut(String),
    on_done: impl FnOnce(),
    on_error: impl FnOnce(StreamError),
) {
    consume_stream(open(history).await, on_delta, on_done, on_error).await;
}
