use axum::extract::{Path, State};
use axum::Json;

use crate::api::dto::snapshot_dto::SnapshotEnvelope;
use crate::api::util::json::to_envelope;
use crate::app_state::AppState;
use crate::domain::hardware::model::hardware_info::{HardwareOverview, NodeHardwareInfo};
use crate::errors::AppError;

pub struct HardwareController;

impl HardwareController {
    pub async fn get_hardware(
        State(state): State<AppState>,
    ) -> Result<Json<SnapshotEnvelope<HardwareOverview>>, AppError> {
        let view = state.cache.hardware().await?;
        to_envelope((*view.data).clone(), &view.status)
    }

    pub async fn get_node_hardware(
        State(state): State<AppState>,
        Path(node_name): Path<String>,
    ) -> Result<Json<SnapshotEnvelope<NodeHardwareInfo>>, AppError> {
        let view = state.cache.hardware().await?;
        let node = view
            .data
            .nodes
            .iter()
            .find(|n| n.node_name == node_name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no hardware record for node {node_name}")))?;
        to_envelope(node, &view.status)
    }
}
