//! # Stream Registry
//!
//! Owns at most one connection per subscription key and fans events out to
//! every subscriber attached to it. Connections are created lazily on the
//! first `open` for a key and torn down when the last subscriber detaches.
//!
//! The registry has an explicit lifecycle: it is constructed by whichever
//! component composes the application and must be `shutdown()` when that
//! component stops. After shutdown, `open` fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::connection::{Connection, Subscriber, TransportHandle};
use super::errors::{StreamError, StreamResult};
use super::pull::{PullSink, PullTransport};
use super::push::{PushSink, PushTransport};
use super::selector::{HostEnv, TransportMode};
use crate::config::StreamConfig;
use crate::http::{HttpClient, TokenProvider};
use crate::observability::Logger;

struct RegistryInner {
    http: Arc<dyn HttpClient>,
    auth: Arc<dyn TokenProvider>,
    config: StreamConfig,
    env: HostEnv,
    connections: Mutex<HashMap<String, Arc<Connection>>>,

    /// Nesting depth of poll pauses; polling resumes only when the
    /// outermost scope ends
    pause_depth: AtomicUsize,

    shut_down: AtomicBool,
}

impl RegistryInner {
    fn detach(&self, key: &str, id: &Uuid) {
        let Ok(mut connections) = self.connections.lock() else {
            return;
        };
        let Some(connection) = connections.get(key) else {
            return;
        };

        if connection.remove_subscriber(id) == 0 {
            if let Some(connection) = connections.remove(key) {
                connection.close();
                Logger::info("CONNECTION_CLOSED", &[("key", key)]);
            }
        }
    }

    fn pull_connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .lock()
            .map(|connections| {
                connections
                    .values()
                    .filter(|c| c.mode() == TransportMode::Pull)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn pause_polls(&self) {
        self.pause_depth.fetch_add(1, Ordering::SeqCst);
        for connection in self.pull_connections() {
            connection.pause_poll();
        }
    }

    fn resume_polls(&self) {
        let _ = self
            .pause_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                Some(depth.saturating_sub(1))
            });
        if self.pause_depth.load(Ordering::SeqCst) > 0 {
            return;
        }
        for connection in self.pull_connections() {
            connection.resume_poll();
        }
    }
}

/// Multiplexer over all active stream connections
pub struct StreamRegistry {
    inner: Arc<RegistryInner>,
}

impl StreamRegistry {
    /// Create a registry
    ///
    /// Connections are started on the Tokio runtime current at the time of
    /// each `open` call.
    pub fn new(
        http: Arc<dyn HttpClient>,
        auth: Arc<dyn TokenProvider>,
        config: StreamConfig,
        env: HostEnv,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                http,
                auth,
                config,
                env,
                connections: Mutex::new(HashMap::new()),
                pause_depth: AtomicUsize::new(0),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Attach a subscriber to the connection for `key`, creating the
    /// connection (and selecting its transport) if none exists.
    ///
    /// The returned handle detaches this subscriber on `close` or drop;
    /// when the last subscriber detaches, the connection's transport is
    /// closed and the connection discarded.
    pub fn open(&self, key: &str, subscriber: Subscriber) -> StreamResult<StreamHandle> {
        if key.is_empty() {
            return Err(StreamError::EmptyKey);
        }
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(StreamError::ShutDown);
        }

        let Ok(mut connections) = self.inner.connections.lock() else {
            return Err(StreamError::ShutDown);
        };

        let connection = match connections.get(key) {
            Some(connection) => Arc::clone(connection),
            None => {
                let mode = TransportMode::select(&self.inner.env);
                let connection = Connection::new(key.to_string(), mode);

                let handle = match mode {
                    TransportMode::Push => {
                        let sink: Arc<dyn PushSink> = connection.clone();
                        TransportHandle::Push(PushTransport::spawn(
                            Arc::clone(&self.inner.http),
                            Arc::clone(&self.inner.auth),
                            self.inner.config.clone(),
                            sink,
                        ))
                    }
                    TransportMode::Pull => {
                        let sink: Arc<dyn PullSink> = connection.clone();
                        let transport = PullTransport::spawn(
                            Arc::clone(&self.inner.http),
                            Arc::clone(&self.inner.auth),
                            self.inner.config.clone(),
                            connection.watermark(),
                            sink,
                        );
                        if self.inner.pause_depth.load(Ordering::SeqCst) > 0 {
                            transport.pause();
                        }
                        TransportHandle::Pull(transport)
                    }
                };
                connection.set_transport(handle);

                Logger::info(
                    "CONNECTION_OPENED",
                    &[("key", key), ("mode", &mode.to_string())],
                );
                connections.insert(key.to_string(), Arc::clone(&connection));
                connection
            }
        };

        let id = connection.add_subscriber(subscriber);
        Ok(StreamHandle {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            id,
            detached: AtomicBool::new(false),
        })
    }

    /// Watermark of the connection for `key`, for callers resuming
    /// independently
    pub fn last_event_id(&self, key: &str) -> Option<u64> {
        self.inner
            .connections
            .lock()
            .ok()
            .and_then(|connections| connections.get(key).map(|c| c.last_event_id()))
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .lock()
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    /// Suspend polling on every pull-mode connection
    ///
    /// Pauses nest; polling resumes when every pause has been released.
    /// Prefer [`StreamRegistry::pause_scope`].
    pub fn pause_polls(&self) {
        self.inner.pause_polls();
    }

    /// Release one poll pause
    pub fn resume_polls(&self) {
        self.inner.resume_polls();
    }

    /// Pause polling for the lifetime of the returned guard
    pub fn pause_scope(&self) -> PollPauseGuard {
        self.inner.pause_polls();
        PollPauseGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Run `fut` with polling suspended, e.g. while another
    /// network-sensitive operation needs exclusive attention
    pub async fn with_polls_paused<F: std::future::Future>(&self, fut: F) -> F::Output {
        let _guard = self.pause_scope();
        fut.await
    }

    /// Close every connection and reject further opens; idempotent
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let connections: Vec<(String, Arc<Connection>)> = self
            .inner
            .connections
            .lock()
            .map(|mut connections| connections.drain().collect())
            .unwrap_or_default();

        let count = connections.len();
        for (_, connection) in connections {
            connection.close();
        }

        Logger::info("REGISTRY_SHUTDOWN", &[("connections", &count.to_string())]);
    }
}

/// Detaches one subscriber on close or drop
pub struct StreamHandle {
    inner: Arc<RegistryInner>,
    key: String,
    id: Uuid,
    detached: AtomicBool,
}

impl StreamHandle {
    /// Detach this subscriber; idempotent
    pub fn close(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.detach(&self.key, &self.id);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Releases its poll pause on drop
pub struct PollPauseGuard {
    inner: Arc<RegistryInner>,
}

impl Drop for PollPauseGuard {
    fn drop(&mut self) {
        self.inner.resume_polls();
    }
}
