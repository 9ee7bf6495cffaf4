//! Cluster controller: summary and namespaces from the cluster snapshot

use axum::extract::State;
use axum::Json;

use crate::api::dto::snapshot_dto::{SnapshotEnvelope, SnapshotList};
use crate::api::util::json::{to_envelope, to_list};
use crate::app_state::AppState;
use crate::domain::cluster::model::cluster_info::ClusterInfo;
use crate::errors::AppError;

pub struct ClusterController;

impl ClusterController {
    pub async fn get_cluster(
        State(state): State<AppState>,
    ) -> Result<Json<SnapshotEnvelope<ClusterInfo>>, AppError> {
        let view = state.cache.cluster().await?;
        to_envelope(view.data.cluster.clone(), &view.status)
    }

    pub async fn list_namespaces(
        State(state): State<AppState>,
    ) -> Result<SnapshotList<String>, AppError> {
        let view = state.cache.cluster().await?;
        to_list(view.data.cluster.namespaces.clone(), view.status)
    }
}
