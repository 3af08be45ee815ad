//! # Transport Selection
//!
//! Chooses push or pull once per logical connection based on host
//! capabilities. The mode never changes for the lifetime of a connection;
//! a fresh connection (new key, or recreated after full teardown)
//! re-evaluates.

use std::fmt;

/// Transport mode for one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Server-push chunked streaming
    Push,

    /// Long polling
    Pull,
}

impl TransportMode {
    /// Deterministically select a mode for the given environment
    pub fn select(env: &HostEnv) -> TransportMode {
        if env.restricted_network {
            TransportMode::Pull
        } else {
            TransportMode::Push
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Push => write!(f, "push"),
            TransportMode::Pull => write!(f, "pull"),
        }
    }
}

/// Capabilities of the hosting environment
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEnv {
    /// True when the host disallows direct streaming fetch and only
    /// request/response round trips are available
    pub restricted_network: bool,
}
