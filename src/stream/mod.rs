//! # Unified Event Stream
//!
//! Real-time event delivery over one of two transports, multiplexed to any
//! number of in-process subscribers.
//!
//! ## Architecture
//!
//! - **Selector**: picks push or pull once per connection
//! - **Push transport**: one live streaming request, framed records,
//!   reconnect with backoff, restart detection
//! - **Pull transport**: one in-flight long poll at a time, pause/resume,
//!   server-authoritative watermark
//! - **Connection**: canonical watermark owner, subscriber fan-out
//! - **Registry**: one connection per subscription key, explicit lifecycle

pub mod backoff;
pub mod connection;
pub mod errors;
pub mod event;
pub mod pull;
pub mod push;
pub mod registry;
pub mod router;
pub mod selector;
pub mod sse;

pub use connection::Subscriber;
pub use errors::{StreamError, StreamResult};
pub use event::{ConnectedInfo, EventPayload, PollResponse, StreamEvent};
pub use pull::{PullSink, PullTransport};
pub use push::{PushSink, PushTransport};
pub use registry::{PollPauseGuard, StreamHandle, StreamRegistry};
pub use router::EventRouter;
pub use selector::{HostEnv, TransportMode};
pub use sse::{SseParser, SseRecord};
