//! # Stream Events
//!
//! Wire types for both transports and the payload decode step.
//!
//! Event identifiers are server-assigned and strictly increasing within one
//! server session; they are meaningless across a session change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One delivered event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Server-assigned identifier, strictly increasing per session
    #[serde(default)]
    pub id: u64,

    /// Event name
    #[serde(rename = "type")]
    pub event_type: String,

    /// Payload as sent by the server
    #[serde(default)]
    pub data: Value,

    /// Server timestamp
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
}

impl StreamEvent {
    /// Decode one event from a poll response entry
    ///
    /// Entries without a string `type` are malformed and yield `None`;
    /// the caller skips them without failing the whole batch.
    pub fn from_value(value: &Value) -> Option<StreamEvent> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Body of a successful long-poll response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    /// Token regenerated on every server restart
    pub server_session_id: String,

    /// Server-authoritative watermark
    pub last_event_id: u64,

    /// Resolved player identifier
    pub player_id: String,

    /// Events since the requested watermark, in delivery order.
    /// Kept as raw values so one malformed entry cannot poison the batch.
    #[serde(default)]
    pub events: Vec<Value>,
}

/// Payload of a push-mode `connected` record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    /// Resolved player identifier
    pub player_id: Option<String>,

    /// Watermark as of connection establishment
    pub last_event_id: Option<u64>,

    /// Token regenerated on every server restart
    pub server_session_id: Option<String>,
}

/// Delivered to subscribers once per connection-establishment cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedInfo {
    /// Resolved player identifier (the subscription key when the server
    /// did not report one)
    pub player_id: String,

    /// Watermark at establishment, when the server reported one
    pub last_event_id: Option<u64>,
}

/// Result of decoding an event payload
///
/// Keeps "parsed" and "unparseable, raw preserved" distinguishable so a
/// consumer can apply its own fallback instead of receiving a silently
/// conflated value.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Structured value
    Json(Value),

    /// Text that did not parse as JSON
    Raw(String),
}

impl EventPayload {
    /// Decode raw record text
    pub fn decode(raw: &str) -> EventPayload {
        match serde_json::from_str(raw) {
            Ok(value) => EventPayload::Json(value),
            Err(_) => EventPayload::Raw(raw.to_string()),
        }
    }

    /// The structured value, if this payload parsed
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            EventPayload::Json(value) => Some(value),
            EventPayload::Raw(_) => None,
        }
    }
}
