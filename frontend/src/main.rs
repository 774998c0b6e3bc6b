mod api;
mod chat_stream;
mod components;
mod state;
mod storage;
mod ws;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::chat::ChatPanel;
use components::news::NewsFeed;
use state::{ChatState, NewsState};

/// Root application component.
#[component]
fn App() -> impl IntoView {
    ChatState::provide();
    let news = NewsState::provide();

    news.refresh();
    news.follow_changes();

    view! {
        <div class="app-container">
            <NewsFeed />
            <ChatPanel />
        </div>
    }
}

fn main() {
    // A second init (hot reload) is harmless; keep running without a logger.
    let _ = console_log::init_with_level(log::Level::Debug);
    mount_to_body(App);
}
