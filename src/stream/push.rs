//! # Push Transport
//!
//! Maintains one live streaming request, parses framed records, and
//! reconnects on failure with exponential backoff.
//!
//! Backoff resets only after a stream that both delivered at least one
//! fully-parsed record and stayed open past the stable-stream threshold;
//! a server that accepts and immediately closes keeps growing the delay.
//!
//! The sink's disconnect notification fires at most once per healthy
//! cycle: it re-arms only after another record is parsed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::backoff::Backoff;
use super::sse::SseParser;
use crate::config::{StreamConfig, PUSH_BACKOFF_FACTOR};
use crate::http::{build_url, HttpClient, TokenProvider};
use crate::observability::Logger;

/// Receives parsed records and cycle-level disconnects
pub trait PushSink: Send + Sync + 'static {
    /// One fully-accumulated record
    fn on_record(&self, event: &str, data: &str);

    /// The previously healthy stream dropped; fired once per cycle
    fn on_disconnect(&self);
}

/// Handle to a running push transport
///
/// Closing aborts the in-flight request, cancels any pending reconnect and
/// suppresses all further reconnection.
pub struct PushTransport {
    closed: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl PushTransport {
    /// Start the transport on the current Tokio runtime
    pub fn spawn(
        http: Arc<dyn HttpClient>,
        auth: Arc<dyn TokenProvider>,
        config: StreamConfig,
        sink: Arc<dyn PushSink>,
    ) -> PushTransport {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run(
            http,
            auth,
            config,
            sink,
            Arc::clone(&closed),
            shutdown_rx,
        ));

        PushTransport { closed, shutdown_tx }
    }

    /// Stop the transport permanently
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    async fn run(
        http: Arc<dyn HttpClient>,
        auth: Arc<dyn TokenProvider>,
        config: StreamConfig,
        sink: Arc<dyn PushSink>,
        closed: Arc<AtomicBool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let url = match build_url(&config.base_url, &config.push_path, &[]) {
            Ok(url) => url,
            Err(e) => {
                Logger::error("PUSH_URL_INVALID", &[("error", &e.to_string())]);
                return;
            }
        };

        let mut backoff = Backoff::new(
            config.push_reconnect_delay,
            PUSH_BACKOFF_FACTOR,
            config.backoff_max,
        );
        // True once a record has been parsed since the last disconnect
        // notification; doubles as the error-callback re-arm.
        let mut healthy = false;
        let mut known_session: Option<String> = None;

        'outer: loop {
            if closed.load(Ordering::SeqCst) {
                break;
            }

            let token = auth.token();
            let started = Instant::now();

            let response = tokio::select! {
                r = http.get_stream(&url, token.as_deref()) => r,
                _ = shutdown_rx.recv() => break 'outer,
            };

            if let Ok(response) = response {
                if let Some(mut body) = response.body {
                    let mut parser = SseParser::new();
                    'read: loop {
                        let chunk = tokio::select! {
                            c = body.next() => c,
                            _ = shutdown_rx.recv() => break 'outer,
                        };
                        match chunk {
                            Some(Ok(bytes)) => {
                                for record in parser.feed(&bytes) {
                                    healthy = true;
                                    if record.event == "connected" {
                                        Self::track_session(&record.data, &mut known_session);
                                    }
                                    // A sink failure must not terminate the read loop
                                    let delivered = catch_unwind(AssertUnwindSafe(|| {
                                        sink.on_record(&record.event, &record.data);
                                    }));
                                    if delivered.is_err() {
                                        Logger::error(
                                            "HANDLER_PANIC",
                                            &[("record", &record.event)],
                                        );
                                    }
                                }
                            }
                            Some(Err(_)) | None => break 'read,
                        }
                    }

                    if healthy && started.elapsed() >= config.min_stable_stream {
                        backoff.reset();
                    }
                }
            }

            if closed.load(Ordering::SeqCst) {
                break;
            }

            if healthy {
                healthy = false;
                sink.on_disconnect();
            }

            let delay = backoff.next();
            Logger::warn(
                "PUSH_RECONNECT_SCHEDULED",
                &[("backoff_ms", &delay.as_millis().to_string())],
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => break 'outer,
            }
        }
    }

    /// Track the server session token carried by `connected` records.
    ///
    /// A changed token is logged and stored here; resetting client state is
    /// the connection's job, not the transport's.
    fn track_session(data: &str, known: &mut Option<String>) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
            Logger::warn("PUSH_CONNECTED_UNPARSEABLE", &[]);
            return;
        };
        let Some(session) = value.get("serverSessionId").and_then(|v| v.as_str()) else {
            return;
        };

        match known.take() {
            Some(previous) if previous != session => {
                Logger::warn(
                    "SERVER_RESTART_DETECTED",
                    &[("previous", &previous), ("current", session)],
                );
                *known = Some(session.to_string());
            }
            Some(previous) => *known = Some(previous),
            None => *known = Some(session.to_string()),
        }
    }
}
