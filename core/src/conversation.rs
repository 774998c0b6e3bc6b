use crate::models::{ChatMessage, Role, MAX_MESSAGE_BYTES, MAX_RELAY_MESSAGES};
use crate::storage::{load_json, save_json, KeyValueStorage};

pub const CHAT_HISTORY_KEY: &str = "hardy-chat-history";

const ERROR_GLYPH: &str = "❌";

/// The chat panel's message list, written through to storage on every change.
///
/// An assistant reply is created lazily on its first delta and grown in place
/// by later deltas until [`ConversationStore::finish_response`] or
/// [`ConversationStore::fail_response`].
#[derive(Debug, Clone)]
pub struct ConversationStore<S> {
    storage: S,
    messages: Vec<ChatMessage>,
    streaming: Option<usize>,
}

impl<S: KeyValueStorage> ConversationStore<S> {
    /// Loads the persisted history; missing or corrupt data yields an empty list.
    pub fn load(storage: S) -> Self {
        let messages = load_json(&storage, CHAT_HISTORY_KEY);
        Self { storage, messages, streaming: None }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The turns to send to the chat relay: the newest messages that fit the
    /// relay's limits, skipping error notices and empty messages. Oversized
    /// contents are cut to [`MAX_MESSAGE_BYTES`].
    pub fn history(&self) -> Vec<ChatMessage> {
        let mut history: Vec<ChatMessage> = self
            .messages
            .iter()
            .rev()
            .filter(|m| !m.content.trim().is_empty() && !is_error_notice(m))
            .take(MAX_RELAY_MESSAGES)
            .map(|m| ChatMessage { role: m.role, content: clip(&m.content).to_string() })
            .collect();
        history.reverse();
        history
    }

    /// Whether an assistant reply is currently being grown by deltas.
    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.streaming = None;
        self.messages.push(ChatMessage::user(content));
        self.persist();
    }

    pub fn apply_delta(&mut self, delta: &str) {
        match self.streaming.and_then(|i| self.messages.get_mut(i)) {
            Some(message) => message.content.push_str(delta),
            None => {
                self.messages.push(ChatMessage::assistant(delta));
                self.streaming = Some(self.messages.len() - 1);
            }
        }
        self.persist();
    }

    pub fn finish_response(&mut self) {
        self.streaming = None;
    }

    /// Appends an error notice after whatever partial reply was received.
    pub fn fail_response(&mut self, error: &str) {
        self.streaming = None;
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: format!("{ERROR_GLYPH} {error}"),
        });
        self.persist();
    }

    pub fn clear(&mut self) {
        self.streaming = None;
        self.messages.clear();
        self.storage.remove(CHAT_HISTORY_KEY);
    }

    fn persist(&self) {
        save_json(&self.storage, CHAT_HISTORY_KEY, &self.messages);
    }
}

fn is_error_notice(message: &ChatMessage) -> bool {
    message.role == Role::Assistant && message.content.starts_with(ERROR_GLYPH)
}

/// Longest prefix of `content` within [`MAX_MESSAGE_BYTES`] that ends on a
/// char boundary.
fn clip(content: &str) -> &str {
    if content.len() <= MAX_MESSAGE_BYTES {
        return content;
    }
    let end = (0..=MAX_MESSAGE_BYTES).rev().find(|&i| content.is_char_boundary(i)).unwrap_or(0);
    &content[..end]
}
