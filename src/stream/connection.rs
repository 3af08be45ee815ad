//! # Connection
//!
//! One connection per subscription key, canonical owner of the watermark
//! and the connected-notification gate. Fans every event out to all
//! current subscribers in transport order.
//!
//! Watermark and session state are updated before dispatch, so a
//! subscriber reacting to an event observes a consistent watermark.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::errors::StreamError;
use super::event::{ConnectedInfo, ConnectedPayload, EventPayload, StreamEvent};
use super::pull::{PullSink, PullTransport};
use super::push::{PushSink, PushTransport};
use super::selector::TransportMode;
use crate::observability::Logger;

type ConnectedFn = Box<dyn Fn(&ConnectedInfo) + Send + Sync>;
type EventFn = Box<dyn Fn(&str, &EventPayload) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&StreamError) + Send + Sync>;

/// Callback bundle registered by one subscriber
///
/// All callbacks are optional; subscribers are independent and each
/// receives every event of its connection.
#[derive(Default)]
pub struct Subscriber {
    on_connected: Option<ConnectedFn>,
    on_event: Option<EventFn>,
    on_error: Option<ErrorFn>,
}

impl Subscriber {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once per connection-establishment cycle
    pub fn on_connected(mut self, f: impl Fn(&ConnectedInfo) + Send + Sync + 'static) -> Self {
        self.on_connected = Some(Box::new(f));
        self
    }

    /// Invoked per delivered event with its name and decoded payload
    pub fn on_event(mut self, f: impl Fn(&str, &EventPayload) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Box::new(f));
        self
    }

    /// Invoked at most once per failure cycle
    pub fn on_error(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// The transport owned by a connection, closed exactly once
pub(crate) enum TransportHandle {
    Push(PushTransport),
    Pull(PullTransport),
}

/// One multiplexed connection
pub(crate) struct Connection {
    key: String,
    mode: TransportMode,
    subscribers: Mutex<HashMap<Uuid, Arc<Subscriber>>>,
    watermark: Arc<AtomicU64>,
    connected_notified: AtomicBool,
    closed: AtomicBool,

    /// Session token observed in push-mode `connected` payloads
    push_session: Mutex<Option<String>>,

    transport: Mutex<Option<TransportHandle>>,
}

impl Connection {
    pub(crate) fn new(key: String, mode: TransportMode) -> Arc<Connection> {
        Arc::new(Connection {
            key,
            mode,
            subscribers: Mutex::new(HashMap::new()),
            watermark: Arc::new(AtomicU64::new(0)),
            connected_notified: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            push_session: Mutex::new(None),
            transport: Mutex::new(None),
        })
    }

    pub(crate) fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Shared watermark cell, handed to the pull transport
    pub(crate) fn watermark(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.watermark)
    }

    /// Highest event identifier durably observed
    pub(crate) fn last_event_id(&self) -> u64 {
        self.watermark.load(Ordering::SeqCst)
    }

    pub(crate) fn set_transport(&self, handle: TransportHandle) {
        if let Ok(mut transport) = self.transport.lock() {
            *transport = Some(handle);
        }
    }

    pub(crate) fn add_subscriber(&self, subscriber: Subscriber) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.insert(id, Arc::new(subscriber));
        }
        id
    }

    /// Remove one subscriber, returning how many remain
    pub(crate) fn remove_subscriber(&self, id: &Uuid) -> usize {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.remove(id);
            subscribers.len()
        } else {
            0
        }
    }

    /// Stop dispatch and close the transport; idempotent
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let handle = self.transport.lock().ok().and_then(|mut t| t.take());
        match handle {
            Some(TransportHandle::Push(transport)) => transport.close(),
            Some(TransportHandle::Pull(transport)) => transport.close(),
            None => {}
        }

        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.clear();
        }
    }

    /// Suspend polling; push-mode connections are unaffected
    pub(crate) fn pause_poll(&self) {
        if let Ok(transport) = self.transport.lock() {
            if let Some(TransportHandle::Pull(transport)) = transport.as_ref() {
                transport.pause();
            }
        }
    }

    pub(crate) fn resume_poll(&self) {
        if let Ok(transport) = self.transport.lock() {
            if let Some(TransportHandle::Pull(transport)) = transport.as_ref() {
                transport.resume();
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver the connected notification at most once per cycle
    fn notify_connected(&self, info: ConnectedInfo) {
        if self.connected_notified.swap(true, Ordering::SeqCst) {
            return;
        }
        for subscriber in self.snapshot() {
            if let Some(callback) = &subscriber.on_connected {
                if catch_unwind(AssertUnwindSafe(|| callback(&info))).is_err() {
                    Logger::error(
                        "HANDLER_PANIC",
                        &[("callback", "on_connected"), ("key", &self.key)],
                    );
                }
            }
        }
    }

    /// Broadcast one event to every current subscriber.
    ///
    /// A panicking callback is logged and skipped; the remaining
    /// subscribers and later events are unaffected.
    fn dispatch_event(&self, name: &str, payload: &EventPayload) {
        for subscriber in self.snapshot() {
            if let Some(callback) = &subscriber.on_event {
                if catch_unwind(AssertUnwindSafe(|| callback(name, payload))).is_err() {
                    Logger::error(
                        "HANDLER_PANIC",
                        &[("callback", "on_event"), ("key", &self.key), ("record", name)],
                    );
                }
            }
        }
    }

    fn dispatch_error(&self, error: &StreamError) {
        for subscriber in self.snapshot() {
            if let Some(callback) = &subscriber.on_error {
                if catch_unwind(AssertUnwindSafe(|| callback(error))).is_err() {
                    Logger::error(
                        "HANDLER_PANIC",
                        &[("callback", "on_error"), ("key", &self.key)],
                    );
                }
            }
        }
    }

    /// Push-mode `connected` record: track the session token, fold the
    /// reported watermark in, and notify subscribers.
    ///
    /// While the token is stable the watermark only moves forward; a
    /// changed token means the server lost its history, so the watermark
    /// restarts from the reported value.
    fn handle_push_connected(&self, payload: &EventPayload) {
        let parsed: ConnectedPayload = payload
            .as_json()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        let mut restarted = false;
        if let Some(session) = parsed.server_session_id.as_ref() {
            if let Ok(mut known) = self.push_session.lock() {
                match known.take() {
                    Some(previous) if previous != *session => {
                        self.watermark
                            .store(parsed.last_event_id.unwrap_or(0), Ordering::SeqCst);
                        *known = Some(session.clone());
                        restarted = true;
                    }
                    Some(previous) => *known = Some(previous),
                    None => *known = Some(session.clone()),
                }
            }
        }
        if !restarted {
            if let Some(id) = parsed.last_event_id {
                self.watermark.fetch_max(id, Ordering::SeqCst);
            }
        }

        let info = ConnectedInfo {
            player_id: parsed.player_id.unwrap_or_else(|| self.key.clone()),
            last_event_id: parsed.last_event_id,
        };
        self.notify_connected(info);
    }
}

impl PushSink for Connection {
    fn on_record(&self, event: &str, data: &str) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let payload = EventPayload::decode(data);
        if event == "connected" {
            self.handle_push_connected(&payload);
            return;
        }
        self.dispatch_event(event, &payload);
    }

    fn on_disconnect(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // Re-arm so the reconnected stream re-notifies establishment
        self.connected_notified.store(false, Ordering::SeqCst);
        self.dispatch_error(&StreamError::Disconnected);
    }
}

impl PullSink for Connection {
    fn on_event(&self, event: StreamEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.dispatch_event(&event.event_type, &EventPayload::Json(event.data));
    }

    fn on_connected(&self, info: ConnectedInfo) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.notify_connected(info);
    }

    fn on_error(&self, status: u16) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.connected_notified.store(false, Ordering::SeqCst);
        self.dispatch_error(&StreamError::PollFailed(status));
    }
}
