//! Shared building blocks of the HARDY portal.
//!
//! Everything here is runtime-agnostic so it compiles both for the axum
//! service and for the wasm frontend: the chat message model, the streaming
//! frame decoder and its driver, the local key-value stores, and the legal
//! reference library.

pub mod conversation;
pub mod models;
pub mod prefs;
pub mod reference;
pub mod relay;
pub mod storage;
pub mod stream;

pub use conversation::{ConversationStore, CHAT_HISTORY_KEY};
pub use models::{
    ChangeEvent, ChangeKind, ChatMessage, ChatRelayRequest, NewsItem, Role, MAX_MESSAGE_BYTES,
    MAX_RELAY_MESSAGES,
};
pub use relay::{consume_stream, StreamError};
pub use storage::{KeyValueStorage, MemoryStorage, StorageError};
pub use stream::FrameDecoder;
