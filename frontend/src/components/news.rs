use hardy_core::NewsItem;
use leptos::prelude::*;

use crate::state::NewsState;

/// News feed with an unread badge. Opening the feed marks everything seen.
#[component]
pub fn NewsFeed() -> impl IntoView {
    let state = expect_context::<NewsState>();

    view! {
        <aside class="news-feed">
            <div class="news-header">
                <h2>"Новости"</h2>
                {move || {
                    let unread = state.unread_count();
                    (unread > 0).then(|| view! { <span class="badge">{unread}</span> })
                }}
                <button class="mark-seen-btn" on:click=move |_| state.mark_all_seen()>
                    "Прочитано"
                </button>
            </div>

            {move || state.error.get().map(|err| view! { <div class="error-banner">{err}</div> })}

            <div class="news-list">
                <For
                    each=move || state.items.get()
                    key=|item| item.id
                    let:item
                >
                    <NewsCard item=item />
                </For>
            </div>
        </aside>
    }
}

#[component]
fn NewsCard(item: NewsItem) -> impl IntoView {
    let state = expect_context::<NewsState>();
    let unread = {
        let item = item.clone();
        move || state.is_unread(&item)
    };
    let posted = item.created_at.format("%d.%m.%Y %H:%M").to_string();

    view! {
        <article class="news-item" class:unread=unread>
            <h3>{item.title}</h3>
            {item.image_url.map(|src| view! { <img class="news-image" src=src /> })}
            <p>{item.content}</p>
            <footer>
                {item.author_avatar.map(|src| view! { <img class="avatar" src=src /> })}
                <span>{item.author_name.unwrap_or_else(|| "HARDY".to_string())}</span>
                <time>{posted}</time>
            </footer>
        </article>
    }
}
