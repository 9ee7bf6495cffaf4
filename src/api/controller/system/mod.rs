//! System controller: cache metadata and probes for the control plane itself

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::dto::system_dto::{HealthResponse, HealthState, SystemStatus};
use crate::app_state::AppState;
use crate::core::state::runtime::aggregation_cache::ResourceKind;

pub struct SystemController;

impl SystemController {
    pub async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
        let now = state.cache.now();
        Json(SystemStatus {
            cluster_name: state.config.cluster_name.clone(),
            version: env!("CARGO_PKG_VERSION"),
            started_at: state.started_at,
            uptime_seconds: (now - state.started_at).num_seconds().max(0),
            snapshots: state.cache.statuses().await,
        })
    }

    /// Always 200; `degraded` while the cluster snapshot is cold or stale.
    pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
        let cluster = state.cache.status(ResourceKind::Cluster).await;
        let status = if cluster.ready && !cluster.stale {
            HealthState::Ok
        } else {
            HealthState::Degraded
        };
        Json(HealthResponse {
            status,
            cluster_stale: cluster.stale,
            cluster_ready: cluster.ready,
        })
    }

    /// Ready once the cluster snapshot has been collected at least once.
    pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
        let cluster = state.cache.status(ResourceKind::Cluster).await;
        if cluster.ready {
            (StatusCode::OK, Json(json!({ "ready": true })))
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ready": false, "reason": "cluster data has not been collected yet" })),
            )
        }
    }

    pub async fn live() -> Json<Value> {
        Json(json!({ "live": true }))
    }
}
