use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::dto::deployment_dto::SubmittedOperation;
use crate::api::dto::snapshot_dto::{SnapshotEnvelope, SnapshotList};
use crate::api::util::json::{accepted, to_envelope, to_list};
use crate::app_state::AppState;
use crate::domain::cluster::model::node_info::NodeInfo;
use crate::errors::AppError;

pub struct NodeController;

impl NodeController {
    pub async fn list_nodes(
        State(state): State<AppState>,
    ) -> Result<SnapshotList<NodeInfo>, AppError> {
        let view = state.cache.cluster().await?;
        to_list(view.data.nodes.clone(), view.status)
    }

    pub async fn get_node(
        State(state): State<AppState>,
        Path(name): Path<String>,
    ) -> Result<Json<SnapshotEnvelope<NodeInfo>>, AppError> {
        let view = state.cache.cluster().await?;
        let node = view
            .data
            .nodes
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("node {name} not found")))?;
        to_envelope(node, &view.status)
    }

    /// Cordon and evict; tracked as an operation.
    pub async fn drain_node(
        State(state): State<AppState>,
        Path(name): Path<String>,
    ) -> Result<(StatusCode, Json<SubmittedOperation>), AppError> {
        let op = state.orchestrator.submit_drain(&name)?;
        Ok(accepted(&op))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::controller::test_support::{respond, state_with, warm_cluster};
    use crate::api::util::json::{LAST_SUCCESS_HEADER, STALE_HEADER};
    use crate::core::client::fake_cluster_api::{k8s_node, FakeClusterApi};

    fn api() -> Arc<FakeClusterApi> {
        Arc::new(FakeClusterApi::with_nodes(vec![
            k8s_node("rpi1", true, Some("control-plane")),
            k8s_node("rpi2", false, None),
        ]))
    }

    #[tokio::test]
    async fn lists_nodes_with_freshness_headers() {
        let api = api();
        let state = state_with(api.clone());
        warm_cluster(&state, api).await;

        let (status, headers, body) = respond(NodeController::list_nodes(State(state)).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[STALE_HEADER], "false");
        assert!(headers.contains_key(LAST_SUCCESS_HEADER));
        assert_eq!(body[0]["name"], "rpi1");
        assert_eq!(body[0]["status"], "Ready");
        assert_eq!(body[0]["roles"], serde_json::json!(["control-plane"]));
        assert_eq!(body[1]["status"], "NotReady");
        assert_eq!(body[1]["metrics"]["cpu_capacity"], "4");
    }

    #[tokio::test]
    async fn unknown_node_is_404() {
        let api = api();
        let state = state_with(api.clone());
        warm_cluster(&state, api).await;

        let (status, _, body) = respond(
            NodeController::get_node(State(state), Path("rpi9".to_string())).await,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn drain_is_accepted_as_operation() {
        let api = api();
        api.hold_mutations();
        let state = state_with(api.clone());

        let (status, _, body) = respond(
            NodeController::drain_node(State(state.clone()), Path("rpi2".to_string())).await,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "Pending");

        let (status, _, body) = respond(
            NodeController::drain_node(State(state), Path("rpi2".to_string())).await,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "OperationInProgress");

        api.release_mutation();
    }
}
