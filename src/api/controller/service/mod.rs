use axum::extract::State;

use crate::api::dto::snapshot_dto::SnapshotList;
use crate::api::util::json::to_list;
use crate::app_state::AppState;
use crate::domain::cluster::model::service_info::ServiceInfo;
use crate::errors::AppError;

pub struct ServiceController;

impl ServiceController {
    pub async fn list_services(
        State(state): State<AppState>,
    ) -> Result<SnapshotList<ServiceInfo>, AppError> {
        let view = state.cache.services().await?;
        to_list(view.data.services.clone(), view.status)
    }
}
