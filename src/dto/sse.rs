//! Payloads of the completions event stream.

use std::time::SystemTime;

use axum::response::sse::Event;
use serde::Serialize;
use utoipa::ToSchema;

use super::format_system_time;

/// Named JSON payload queued for a completions stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEvent {
    /// SSE event name.
    pub name: &'static str,
    /// JSON encoded payload.
    pub data: String,
}

impl StreamEvent {
    /// Serialize `payload` as the data of event `name`.
    pub fn encode<T: Serialize>(name: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            name,
            data: serde_json::to_string(payload)?,
        })
    }
}

impl From<StreamEvent> for Event {
    fn from(value: StreamEvent) -> Self {
        Event::default().event(value.name).data(value.data)
    }
}

/// First event of every completions stream.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamHello {
    /// Greeting text.
    pub message: String,
    /// Whether the remote store is currently out of reach.
    pub degraded: bool,
    /// RFC 3339 connection time.
    pub connected_at: String,
}

impl StreamHello {
    /// Hello stamped with the current time.
    pub fn new(degraded: bool) -> Self {
        Self {
            message: "completions stream connected".into(),
            degraded,
            connected_at: format_system_time(SystemTime::now()),
        }
    }
}

/// Sent whenever the remote store is lost or comes back.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    /// Whether the store is now unreachable.
    pub degraded: bool,
    /// RFC 3339 time of the change.
    pub changed_at: String,
}

impl StoreStatus {
    /// Status change observed now.
    pub fn new(degraded: bool) -> Self {
        Self {
            degraded,
            changed_at: format_system_time(SystemTime::now()),
        }
    }
}
