//! Cluster routes (/api/cluster, /api/nodes, /api/services, /api/namespaces)

use axum::{routing::{get, post}, Router};

use crate::api::controller::cluster::ClusterController;
use crate::api::controller::node::NodeController;
use crate::api::controller::service::ServiceController;
use crate::app_state::AppState;

pub fn cluster_routes() -> Router<AppState> {
    Router::new()
        .route("/cluster", get(ClusterController::get_cluster))
        .route("/namespaces", get(ClusterController::list_namespaces))

        // Nodes
        .route("/nodes", get(NodeController::list_nodes))
        .route("/nodes/{name}", get(NodeController::get_node))
        .route("/nodes/{name}/drain", post(NodeController::drain_node))

        // Services
        .route("/services", get(ServiceController::list_services))
}
