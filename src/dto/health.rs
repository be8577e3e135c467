//! Health report body.

use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use super::format_system_time;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether completion and settings reads are served from the local cache only.
    pub degraded: bool,
    /// RFC 3339 time of the check.
    pub checked_at: String,
}

impl HealthResponse {
    fn new(degraded: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            degraded,
            checked_at: format_system_time(SystemTime::now()),
        }
    }

    /// The remote store is reachable.
    pub fn ok() -> Self {
        Self::new(false)
    }

    /// The remote store is unreachable.
    pub fn degraded() -> Self {
        Self::new(true)
    }
}
