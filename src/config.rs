//! Stream client configuration
//!
//! Tuning constants for both transports. The stable-stream threshold and
//! backoff curves are tunables, not protocol requirements.

use std::time::Duration;

/// Initial reconnect delay for the push transport
pub const PUSH_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Initial backoff for the pull transport
pub const POLL_INITIAL_BACKOFF: Duration = Duration::from_millis(1_000);

/// Upper bound for both backoff curves
pub const BACKOFF_MAX: Duration = Duration::from_millis(30_000);

/// Server-side long-poll budget, sent as the `timeoutMs` request parameter
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Minimum stream lifetime before a push connection counts as stable and
/// its backoff resets. Prevents a tight reconnect loop when the server
/// accepts and immediately closes (e.g. mid-restart).
pub const MIN_STABLE_STREAM: Duration = Duration::from_millis(10_000);

/// Growth factor for the push reconnect backoff
pub const PUSH_BACKOFF_FACTOR: f64 = 1.5;

/// Growth factor for the pull backoff
pub const POLL_BACKOFF_FACTOR: f64 = 1.7;

/// Configuration for one stream client
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base URL of the event server
    pub base_url: String,

    /// Path of the push (streaming) endpoint, relative to `base_url`
    pub push_path: String,

    /// Path of the long-poll endpoint, relative to `base_url`
    pub poll_path: String,

    /// Initial push reconnect delay
    pub push_reconnect_delay: Duration,

    /// Initial pull backoff
    pub poll_initial_backoff: Duration,

    /// Cap applied to both backoff curves
    pub backoff_max: Duration,

    /// Long-poll budget passed to the server
    pub poll_timeout: Duration,

    /// Stream lifetime required before the push backoff resets
    pub min_stable_stream: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000/".to_string(),
            push_path: "events/stream".to_string(),
            poll_path: "events/poll".to_string(),
            push_reconnect_delay: PUSH_RECONNECT_DELAY,
            poll_initial_backoff: POLL_INITIAL_BACKOFF,
            backoff_max: BACKOFF_MAX,
            poll_timeout: LONG_POLL_TIMEOUT,
            min_stable_stream: MIN_STABLE_STREAM,
        }
    }
}

impl StreamConfig {
    /// Create a configuration pointing at the given server
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.push_reconnect_delay, Duration::from_millis(5_000));
        assert_eq!(config.poll_initial_backoff, Duration::from_millis(1_000));
        assert_eq!(config.backoff_max, Duration::from_millis(30_000));
        assert_eq!(config.poll_timeout, Duration::from_millis(25_000));
    }

    #[test]
    fn test_new_overrides_base_url() {
        let config = StreamConfig::new("https://events.example.com/");
        assert_eq!(config.base_url, "https://events.example.com/");
        assert_eq!(config.push_path, "events/stream");
    }
}
