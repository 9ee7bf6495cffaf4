//! Deployment routes (/api/deployments/*)

use axum::{routing::{delete, get, post}, Router};

use crate::api::controller::deployment::DeploymentController;
use crate::app_state::AppState;

pub fn deployment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/deployments",
            get(DeploymentController::list).post(DeploymentController::create),
        )
        .route("/deployments/{id}", get(DeploymentController::get))
        .route("/deployments/{namespace}/{name}", delete(DeploymentController::delete))
        .route("/deployments/{namespace}/{name}/scale", post(DeploymentController::scale))
        .route("/deployments/{namespace}/{name}/restart", post(DeploymentController::restart))
}
