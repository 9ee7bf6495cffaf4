//! System API DTOs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::state::runtime::aggregation_cache::SnapshotStatus;

#[derive(Serialize)]
pub struct SystemStatus {
    pub cluster_name: String,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub snapshots: Vec<SnapshotStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Degraded,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthState,
    pub cluster_stale: bool,
    pub cluster_ready: bool,
}
