//! System routes (/api/status, /api/health, /api/ready, /api/live)

use axum::{routing::get, Router};

use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(SystemController::status))
        .route("/health", get(SystemController::health))
        .route("/ready", get(SystemController::ready))
        .route("/live", get(SystemController::live))
}
