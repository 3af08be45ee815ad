//! # Retry Backoff
//!
//! Exponential backoff shared by both transports. The curves differ on
//! purpose: push failures are typically transient network blips (×1.5),
//! pull failures are full round-trip failures (×1.7). Both cap at the same
//! maximum.

use std::time::Duration;

/// Exponential backoff state
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    factor: f64,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff starting at `initial`, growing by `factor` per
    /// consecutive failure, capped at `cap`
    pub fn new(initial: Duration, factor: f64, cap: Duration) -> Self {
        Self {
            initial,
            factor,
            cap,
            current: initial,
        }
    }

    /// The delay to apply now; grows the next delay
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.cap.min(self.current.mul_f64(self.factor));
        delay
    }

    /// Return to the initial delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// The delay the next `next()` call would return
    pub fn current(&self) -> Duration {
        self.current
    }
}
