//! aetherlink - A resilient real-time event stream client
//!
//! Maintains a live, ordered stream of server events over one of two
//! transports (server-push streaming or long polling) and fans it out to
//! any number of in-process subscribers.

pub mod cli;
pub mod config;
pub mod http;
pub mod observability;
pub mod stream;

pub use config::StreamConfig;
pub use http::{HttpClient, ReqwestClient, StaticToken, TokenProvider};
pub use stream::{
    ConnectedInfo, EventPayload, EventRouter, HostEnv, StreamError, StreamEvent, StreamHandle,
    StreamRegistry, Subscriber, TransportMode,
};
