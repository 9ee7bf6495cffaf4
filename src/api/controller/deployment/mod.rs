//! Deployment controller: every mutation is accepted as a tracked operation

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::dto::deployment_dto::SubmittedOperation;
use crate::api::util::json::accepted;
use crate::app_state::AppState;
use crate::domain::deployment::dto::deployment_request::{
    DeleteQuery, DeploymentRequest, ScaleRequest,
};
use crate::domain::deployment::model::deployment_operation::DeploymentStatus;
use crate::errors::AppError;

pub struct DeploymentController;

impl DeploymentController {
    pub async fn create(
        State(state): State<AppState>,
        payload: Result<Json<DeploymentRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<SubmittedOperation>), AppError> {
        let Json(request) = payload?;
        let op = state.orchestrator.submit_deploy(request)?;
        Ok(accepted(&op))
    }

    pub async fn list(State(state): State<AppState>) -> Json<Vec<DeploymentStatus>> {
        Json(state.orchestrator.list())
    }

    pub async fn get(
        State(state): State<AppState>,
        path: Result<Path<Uuid>, PathRejection>,
    ) -> Result<Json<DeploymentStatus>, AppError> {
        let Path(id) = path?;
        Ok(Json(state.orchestrator.get(id)?))
    }

    pub async fn scale(
        State(state): State<AppState>,
        path: Result<Path<(String, String)>, PathRejection>,
        payload: Result<Json<ScaleRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<SubmittedOperation>), AppError> {
        let Path((namespace, name)) = path?;
        let Json(request) = payload?;
        let op = state.orchestrator.submit_scale(&namespace, &name, request)?;
        Ok(accepted(&op))
    }

    pub async fn restart(
        State(state): State<AppState>,
        path: Result<Path<(String, String)>, PathRejection>,
    ) -> Result<(StatusCode, Json<SubmittedOperation>), AppError> {
        let Path((namespace, name)) = path?;
        let op = state.orchestrator.submit_restart(&namespace, &name)?;
        Ok(accepted(&op))
    }

    pub async fn delete(
        State(state): State<AppState>,
        path: Result<Path<(String, String)>, PathRejection>,
        query: Result<Query<DeleteQuery>, QueryRejection>,
    ) -> Result<(StatusCode, Json<SubmittedOperation>), AppError> {
        let Path((namespace, name)) = path?;
        let Query(query) = query?;
        let op = state
            .orchestrator
            .submit_delete(&namespace, &name, query.delete_service)?;
        Ok(accepted(&op))
    }
}
