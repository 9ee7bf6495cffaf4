//! Hardware routes (/api/hardware/*)

use axum::{routing::get, Router};

use crate::api::controller::hardware::HardwareController;
use crate::app_state::AppState;

pub fn hardware_routes() -> Router<AppState> {
    Router::new()
        .route("/hardware", get(HardwareController::get_hardware))
        .route("/hardware/{node_name}", get(HardwareController::get_node_hardware))
}
