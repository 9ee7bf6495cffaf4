use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::core::state::runtime::aggregation_cache::CacheMiss;
use crate::domain::deployment::service::deployment_orchestrator::OrchestratorError;

#[derive(Debug, Error)]
pub enum AppError {
    /// No snapshot has been collected yet for the requested resource.
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("operation {operation_id} is already in progress for {target}")]
    OperationInProgress { target: String, operation_id: Uuid },

    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OperationInProgress { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::ServiceUnavailable(_) => "ServiceUnavailable",
            AppError::ValidationError(_) => "ValidationError",
            AppError::OperationInProgress { .. } => "OperationInProgress",
            AppError::NotFound(_) => "NotFound",
        }
    }
}

impl From<CacheMiss> for AppError {
    fn from(miss: CacheMiss) -> Self {
        AppError::ServiceUnavailable(miss.to_string())
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(msg) => AppError::ValidationError(msg),
            OrchestratorError::OperationInProgress { target, active } => {
                AppError::OperationInProgress {
                    target,
                    operation_id: active,
                }
            }
            OrchestratorError::NotFound(id) => AppError::NotFound(format!("operation {id} not found")),
        }
    }
}

/// Malformed bodies, path segments and query strings are validation failures.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let AppError::OperationInProgress { operation_id, .. } = &self {
            body["operation_id"] = json!(operation_id);
        }

        (status, Json(body)).into_response()
    }
}
