use chrono::Utc;
use hardy_core::prefs::{NewsLastSeen, Stored, news_last_seen};
use hardy_core::{ChangeEvent, ConversationStore, NewsItem};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::chat_stream::stream_chat;
use crate::storage::BrowserStorage;
use crate::ws;

const NEWS_PAGE_SIZE: u32 = 30;

/// Chat panel state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct ChatState {
    pub conversation: ReadSignal<ConversationStore<BrowserStorage>>,
    pub is_loading: ReadSignal<bool>,

    set_conversation: WriteSignal<ConversationStore<BrowserStorage>>,
    set_is_loading: WriteSignal<bool>,
}

impl ChatState {
    /// Loads the persisted conversation and provides the state in context.
    pub fn provide() -> Self {
        let (conversation, set_conversation) = signal(ConversationStore::load(BrowserStorage));
        let (is_loading, set_is_loading) = signal(false);

        let state = Self { conversation, is_loading, set_conversation, set_is_loading };
        provide_context(state);
        state
    }

    /// Appends the user's message and streams the assistant reply into the
    /// conversation. Ignored while a reply is still in flight.
    pub fn send_message(&self, text: String) {
        if self.is_loading.get_untracked() {
            return;
        }
        let set_conversation = self.set_conversation;
        let set_is_loading = self.set_is_loading;

        set_conversation.update(|store| store.push_user(text));
        let history = self.conversation.with_untracked(|store| store.history());
        set_is_loading.set(true);

        spawn_local(async move {
            stream_chat(
                history,
                move |delta| set_conversation.update(|store| store.apply_delta(&delta)),
                move || {
                    set_conversation.update(|store| store.finish_response());
                    set_is_loading.set(false);
                },
                move |err| {
                    log::error!("chat stream failed: {err}");
                    set_conversation.update(|store| store.fail_response(&err.to_string()));
                    set_is_loading.set(false);
                },
            )
            .await;
        });
    }

    pub fn clear(&self) {
        self.set_conversation.update(|store| store.clear());
    }
}

/// News feed state: the latest items plus the persisted last-seen marker.
#[derive(Clone, Copy)]
pub struct NewsState {
    pub items: ReadSignal<Vec<NewsItem>>,
    pub error: ReadSignal<Option<String>>,
    last_seen: ReadSignal<Stored<BrowserStorage, NewsLastSeen>>,

    set_items: WriteSignal<Vec<NewsItem>>,
    set_error: WriteSignal<Option<String>>,
    set_last_seen: WriteSignal<Stored<BrowserStorage, NewsLastSeen>>,
}

impl NewsState {
    pub fn provide() -> Self {
        let (items, set_items) = signal(Vec::<NewsItem>::new());
        let (error, set_error) = signal(None::<String>);
        let (last_seen, set_last_seen) = signal(news_last_seen(BrowserStorage));

        let state = Self { items, error, last_seen, set_items, set_error, set_last_seen };
        provide_context(state);
        state
    }

    /// Re-fetches the feed. Safe to call any number of times.
    pub fn refresh(&self) {
        let set_items = self.set_items;
        let set_error = self.set_error;
        spawn_local(async move {
            match api::fetch_news(NEWS_PAGE_SIZE).await {
                Ok(items) => {
                    set_items.set(items);
                    set_error.set(None);
                }
                Err(e) => {
                    log::error!("Failed to fetch news: {e}");
                    set_error.set(Some(e));
                }
            }
        });
    }

    /// Keeps the feed fresh: every change-feed event triggers a refresh.
    pub fn follow_changes(&self) {
        let state = *self;
        ws::subscribe_changes("news", move |event: ChangeEvent| {
            log::debug!("news change: {:?}", event.kind);
            state.refresh();
        });
    }

    pub fn is_unread(&self, item: &NewsItem) -> bool {
        self.last_seen.with(|seen| seen.get().is_unread(item))
    }

    pub fn unread_count(&self) -> usize {
        let items = self.items.get();
        self.last_seen.with(|seen| seen.get().unread_count(&items))
    }

    pub fn mark_all_seen(&self) {
        self.set_last_seen.update(|seen| seen.update(|value| value.mark_seen(Utc::now())));
    }
}
