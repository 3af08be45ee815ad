//! # Pull Transport
//!
//! Repeatedly performs one long-poll request that the server holds open
//! until new events exist or its timeout elapses, then immediately issues
//! the next one. At most one request is in flight at any time.
//!
//! A generation counter is incremented on every close, pause, and request
//! start so that a response arriving after the transport was closed or
//! paused is discarded rather than acted upon.
//!
//! Pausing aborts the in-flight request without discarding the watermark
//! or session token; resuming issues a new poll immediately. Closing is a
//! permanent pause.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use super::backoff::Backoff;
use super::event::{ConnectedInfo, PollResponse, StreamEvent};
use crate::config::{StreamConfig, POLL_BACKOFF_FACTOR};
use crate::http::{build_url, HttpClient, TokenProvider};
use crate::observability::Logger;

/// Receives poll results
pub trait PullSink: Send + Sync + 'static {
    /// One well-formed event, in response order
    fn on_event(&self, event: StreamEvent);

    /// A poll succeeded; fired on every success, gating is the caller's job
    fn on_connected(&self, info: ConnectedInfo);

    /// A poll failed (status 0 for transport-level errors)
    fn on_error(&self, status: u16);
}

struct PullShared {
    http: Arc<dyn HttpClient>,
    auth: Arc<dyn TokenProvider>,
    config: StreamConfig,
    sink: Arc<dyn PullSink>,

    /// Canonical watermark, owned by the connection
    watermark: Arc<AtomicU64>,

    /// Last observed server session token
    session: Mutex<Option<String>>,

    closed: AtomicBool,
    paused: AtomicBool,

    /// Incremented on close, pause, and request start
    generation: AtomicU64,

    /// Aborts the in-flight request or pending delay
    interrupt: Notify,

    /// Wakes the loop out of the paused state
    wake: Notify,
}

/// Handle to a running pull transport
pub struct PullTransport {
    shared: Arc<PullShared>,
}

impl PullTransport {
    /// Start the transport on the current Tokio runtime
    ///
    /// `watermark` is shared with the owning connection; polls resume from
    /// its current value.
    pub fn spawn(
        http: Arc<dyn HttpClient>,
        auth: Arc<dyn TokenProvider>,
        config: StreamConfig,
        watermark: Arc<AtomicU64>,
        sink: Arc<dyn PullSink>,
    ) -> PullTransport {
        let shared = Arc::new(PullShared {
            http,
            auth,
            config,
            sink,
            watermark,
            session: Mutex::new(None),
            closed: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            interrupt: Notify::new(),
            wake: Notify::new(),
        });

        tokio::spawn(Self::run(Arc::clone(&shared)));

        PullTransport { shared }
    }

    /// Abort the in-flight request and stop scheduling polls, keeping the
    /// watermark and session token
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.interrupt.notify_one();
    }

    /// Resume polling; issues a new poll immediately if none is in flight
    pub fn resume(&self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    /// Stop the transport permanently
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.interrupt.notify_one();
        self.shared.wake.notify_one();
    }

    /// Current watermark
    pub fn last_event_id(&self) -> u64 {
        self.shared.watermark.load(Ordering::SeqCst)
    }

    async fn run(shared: Arc<PullShared>) {
        let mut backoff = Backoff::new(
            shared.config.poll_initial_backoff,
            POLL_BACKOFF_FACTOR,
            shared.config.backoff_max,
        );
        let mut delay = Duration::ZERO;

        loop {
            if shared.closed.load(Ordering::SeqCst) {
                break;
            }

            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.interrupt.notified() => {}
                }
                delay = Duration::ZERO;
                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
            }

            if shared.paused.load(Ordering::SeqCst) {
                shared.wake.notified().await;
                continue;
            }

            let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let since = shared.watermark.load(Ordering::SeqCst);
            let url = match build_url(
                &shared.config.base_url,
                &shared.config.poll_path,
                &[
                    ("since", since.to_string()),
                    ("timeoutMs", shared.config.poll_timeout.as_millis().to_string()),
                ],
            ) {
                Ok(url) => url,
                Err(e) => {
                    Logger::error("POLL_URL_INVALID", &[("error", &e.to_string())]);
                    return;
                }
            };

            let token = shared.auth.token();
            let response = tokio::select! {
                r = shared.http.get_json(&url, token.as_deref()) => Some(r),
                _ = shared.interrupt.notified() => None,
            };

            let Some(response) = response else {
                // Aborted by pause or close
                continue;
            };
            if shared.closed.load(Ordering::SeqCst)
                || shared.paused.load(Ordering::SeqCst)
                || shared.generation.load(Ordering::SeqCst) != generation
            {
                // Stale response; a newer cycle owns the transport now
                continue;
            }

            let (status, parsed) = match response {
                Ok(json) if json.is_success() => {
                    let status = json.status;
                    let parsed = json
                        .body
                        .and_then(|body| serde_json::from_value::<PollResponse>(body).ok());
                    (status, parsed)
                }
                Ok(json) => (json.status, None),
                Err(_) => (0, None),
            };

            match parsed {
                Some(poll) => {
                    Self::handle_success(&shared, poll, &mut backoff);
                    delay = Duration::ZERO;
                }
                None => {
                    Logger::warn("POLL_ERROR", &[("status", &status.to_string())]);
                    shared.sink.on_error(status);
                    delay = backoff.next();
                }
            }
        }
    }

    fn handle_success(shared: &PullShared, poll: PollResponse, backoff: &mut Backoff) {
        {
            let mut session = match shared.session.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match session.take() {
                Some(previous) if previous != poll.server_session_id => {
                    // Server restart: prior history is gone. Adopt the new
                    // token and restart from the reported watermark; the
                    // events below are already part of the new session.
                    Logger::warn(
                        "SERVER_RESTART_DETECTED",
                        &[("previous", &previous), ("current", &poll.server_session_id)],
                    );
                    *session = Some(poll.server_session_id.clone());
                }
                Some(previous) => *session = Some(previous),
                None => *session = Some(poll.server_session_id.clone()),
            }
        }

        // Server value is the source of truth; stored before any dispatch
        shared.watermark.store(poll.last_event_id, Ordering::SeqCst);

        shared.sink.on_connected(ConnectedInfo {
            player_id: poll.player_id,
            last_event_id: Some(poll.last_event_id),
        });

        for raw in &poll.events {
            match StreamEvent::from_value(raw) {
                Some(event) => shared.sink.on_event(event),
                None => Logger::warn("MALFORMED_EVENT_SKIPPED", &[]),
            }
        }

        backoff.reset();
    }
}
