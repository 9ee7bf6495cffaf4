use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::dto::deployment_dto::SubmittedOperation;
use crate::api::dto::snapshot_dto::{SnapshotEnvelope, SnapshotList};
use crate::core::state::runtime::aggregation_cache::SnapshotStatus;
use crate::domain::deployment::model::deployment_operation::DeploymentStatus;
use crate::errors::AppError;

pub const STALE_HEADER: &str = "x-snapshot-stale";
pub const LAST_SUCCESS_HEADER: &str = "x-snapshot-last-success";

pub fn to_envelope<T: Serialize>(
    data: T,
    status: &SnapshotStatus,
) -> Result<Json<SnapshotEnvelope<T>>, AppError> {
    Ok(Json(SnapshotEnvelope::new(data, status)))
}

pub fn to_list<T: Serialize>(
    items: Vec<T>,
    status: SnapshotStatus,
) -> Result<SnapshotList<T>, AppError> {
    Ok(SnapshotList { items, status })
}

pub fn accepted(op: &DeploymentStatus) -> (StatusCode, Json<SubmittedOperation>) {
    (StatusCode::ACCEPTED, Json(SubmittedOperation::from(op)))
}

pub fn staleness_headers(status: &SnapshotStatus) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        STALE_HEADER,
        HeaderValue::from_static(if status.stale { "true" } else { "false" }),
    );
    if let Some(value) = status
        .last_success_at
        .and_then(|at| HeaderValue::from_str(&at.to_rfc3339()).ok())
    {
        headers.insert(LAST_SUCCESS_HEADER, value);
    }
    headers
}

impl<T: Serialize> IntoResponse for SnapshotList<T> {
    fn into_response(self) -> Response {
        (staleness_headers(&self.status), Json(self.items)).into_response()
    }
}
