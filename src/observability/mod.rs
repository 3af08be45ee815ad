//! # Observability
//!
//! Structured logging for transport lifecycle events: reconnects, server
//! restarts, handler failures. One log line = one event.
//!
//! Logging is read-only with respect to stream state and must never affect
//! delivery; a failed write is silently dropped.

pub mod logger;

pub use logger::{Logger, Severity};
