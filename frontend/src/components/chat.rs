use hardy_core::Role;
use leptos::ev;
use leptos::prelude::*;

use crate::state::ChatState;

/// The legal assistant panel: history, the reply being streamed, and input.
#[component]
pub fn ChatPanel() -> impl IntoView {
    let state = expect_context::<ChatState>();

    view! {
        <section class="chat-panel">
            <div class="chat-header">
                <span>"Юридический ассистент"</span>
                <button
                    class="clear-btn"
                    on:click=move |_| state.clear()
                    disabled=move || state.is_loading.get()
                >
                    "Очистить"
                </button>
            </div>

            <div class="messages-container">
                {move || {
                    let messages = state.conversation.with(|store| store.messages().to_vec());
                    if messages.is_empty() {
                        view! {
                            <div class="empty-state">
                                "Задайте вопрос о кодексах сервера"
                            </div>
                        }.into_any()
                    } else {
                        messages
                            .into_iter()
                            .map(|m| view! { <MessageBubble role=m.role content=m.content /> })
                            .collect_view()
                            .into_any()
                    }
                }}
                {move || {
                    // Typing indicator until the first delta arrives.
                    let waiting = state.is_loading.get()
                        && !state.conversation.with(|store| store.is_streaming());
                    waiting.then(|| view! { <div class="message assistant typing">"…"</div> })
                }}
            </div>

            <ChatInput />
        </section>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(role: Role, content: String) -> impl IntoView {
    let css_class = match role {
        Role::User => "message user",
        Role::Assistant => "message assistant",
    };

    view! {
        <div class=css_class>
            <div class="role-label">{role.to_string()}</div>
            <div>{content}</div>
        </div>
    }
}

/// Chat input with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<ChatState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.is_loading.get();

    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() || is_sending() {
            return;
        }
        set_input.set(String::new());
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Ваш вопрос… (Enter — отправить, Shift+Enter — новая строка)"
                    prop:value=input
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Отправка…" } else { "Отправить" }}
                </button>
            </div>
        </div>
    }
}
