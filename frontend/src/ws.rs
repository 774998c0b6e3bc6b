use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use hardy_core::ChangeEvent;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use crate::api::changes_ws_url;

const RECONNECT_DELAY_MS: u32 = 3_000;

type EventHandler = Rc<dyn Fn(ChangeEvent)>;

/// One open socket together with the JS callbacks bound to it. Dropping it
/// detaches the callbacks from the socket and frees them.
struct Connection {
    ws: WebSocket,
    _onopen: Option<Closure<dyn Fn()>>,
    _onmessage: Closure<dyn Fn(MessageEvent)>,
    _onclose: Closure<dyn Fn(CloseEvent)>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
    }
}

/// Holds the live connection; replaced on every reconnect.
type Slot = Rc<RefCell<Option<Connection>>>;

/// Puts `next` in the slot, dropping whatever connection was there.
fn replace<T>(slot: &RefCell<Option<T>>, next: Option<T>) {
    let previous = slot.replace(next);
    drop(previous);
}

/// Subscribes to the change feed for `table`. The connection is re-opened
/// after it drops; each reconnect reports a resync event because anything
/// published in between was missed.
pub fn subscribe_changes(table: &'static str, on_event: impl Fn(ChangeEvent) + 'static) {
    connect(table, Rc::new(on_event), Rc::new(RefCell::new(None)), false);
}

fn connect(table: &'static str, on_event: EventHandler, slot: Slot, reconnecting: bool) {
    let ws = match WebSocket::new(&changes_ws_url(table)) {
        Ok(ws) => ws,
        Err(e) => {
            log::error!("Failed to open change feed: {e:?}");
            schedule_reconnect(table, on_event, slot);
            return;
        }
    };

    // --- onopen: catch up on anything missed while disconnected ---
    let onopen = reconnecting.then(|| {
        let on_event = on_event.clone();
        let onopen = Closure::<dyn Fn()>::new(move || on_event(ChangeEvent::resync()));
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen
    });

    // --- onmessage: dispatch ChangeEvent ---
    let on_event_msg = on_event.clone();
    let onmessage = Closure::<dyn Fn(MessageEvent)>::new(move |ev: MessageEvent| {
        let Some(text) = ev.data().as_string() else { return };
        match serde_json::from_str::<ChangeEvent>(&text) {
            Ok(event) => on_event_msg(event),
            Err(e) => log::warn!("Ignoring malformed change event: {e}"),
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

    // --- onclose: reconnect ---
    let slot_close = slot.clone();
    let onclose = Closure::<dyn Fn(CloseEvent)>::new(move |ev: CloseEvent| {
        log::warn!("Change feed closed (code {}), reconnecting", ev.code());
        schedule_reconnect(table, on_event.clone(), slot_close.clone());
    });
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    replace(
        &slot,
        Some(Connection { ws, _onopen: onopen, _onmessage: onmessage, _onclose: onclose }),
    );
}

fn schedule_reconnect(table: &'static str, on_event: EventHandler, slot: Slot) {
    spawn_local(async move {
        TimeoutFuture::new(RECONNECT_DELAY_MS).await;
        // The old callbacks are no longer running here, so they can be freed.
        replace(&slot, None);
        connect(table, on_event, slot, true);
    });
}
