//! # Event Router
//!
//! Lookup table from event name to handler, so consumers add new event
//! types as table entries instead of growing a conditional chain.

use std::collections::HashMap;

use super::connection::Subscriber;
use super::event::EventPayload;

type Handler = Box<dyn Fn(&EventPayload) + Send + Sync>;
type FallbackHandler = Box<dyn Fn(&str, &EventPayload) + Send + Sync>;

/// Name-keyed event dispatch table
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Handler>,
    fallback: Option<FallbackHandler>,
}

impl EventRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for one event name, replacing any previous one
    pub fn on(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&EventPayload) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    /// Register a handler for events with no table entry
    pub fn fallback(mut self, handler: impl Fn(&str, &EventPayload) + Send + Sync + 'static) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Dispatch one event; returns whether any handler ran
    pub fn handle(&self, name: &str, payload: &EventPayload) -> bool {
        if let Some(handler) = self.handlers.get(name) {
            handler(payload);
            return true;
        }
        if let Some(fallback) = &self.fallback {
            fallback(name, payload);
            return true;
        }
        false
    }

    /// Wrap this router as a subscriber's event callback
    pub fn into_subscriber(self) -> Subscriber {
        Subscriber::new().on_event(move |name, payload| {
            self.handle(name, payload);
        })
    }
}
