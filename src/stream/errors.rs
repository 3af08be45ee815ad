//! # Stream Errors
//!
//! Error types for the event stream. Only contract violations are returned
//! synchronously from the public API; transport failures are absorbed by
//! backoff and surfaced through the rate-limited `on_error` callback.

use thiserror::Error;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Stream errors
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    // ==================
    // Contract Violations
    // ==================
    /// Subscription key must not be empty
    #[error("Subscription key must not be empty")]
    EmptyKey,

    /// Registry already shut down
    #[error("Registry has been shut down")]
    ShutDown,

    // ==================
    // Transport Failures (callback-only)
    // ==================
    /// Push stream dropped; reconnecting with backoff
    #[error("Transport disconnected")]
    Disconnected,

    /// Long poll failed; retrying with backoff
    #[error("Poll request failed (status {0})")]
    PollFailed(u16),

    // ==================
    // Configuration
    // ==================
    /// Malformed endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
