use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::state::runtime::aggregation_cache::SnapshotStatus;

/// Object payload with the snapshot's freshness alongside its own fields.
#[derive(Debug, Serialize)]
pub struct SnapshotEnvelope<T> {
    #[serde(flatten)]
    pub data: T,
    pub stale: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl<T> SnapshotEnvelope<T> {
    pub fn new(data: T, status: &SnapshotStatus) -> Self {
        Self {
            data,
            stale: status.stale,
            last_success_at: status.last_success_at,
            last_error: status.last_error.clone(),
        }
    }
}

/// Array payload; freshness travels in response headers.
#[derive(Debug)]
pub struct SnapshotList<T> {
    pub items: Vec<T>,
    pub status: SnapshotStatus,
}
