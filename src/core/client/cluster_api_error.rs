use thiserror::Error;

/// Every failure the cluster client can surface. Callers match on the variant;
/// the message keeps whatever the API server said.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterApiError {
    #[error("API server unavailable: {0}")]
    ApiUnavailable(String),

    #[error("rejected by API server: {0}")]
    ValidationError(String),

    #[error("apply conflict: {0}")]
    ApplyConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("node busy: {0}")]
    NodeBusy(String),

    #[error("unexpected API response: {0}")]
    Unexpected(String),
}

impl ClusterApiError {
    /// Stable machine-readable name, surfaced as `error_kind` on operations.
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterApiError::ApiUnavailable(_) => "ApiUnavailable",
            ClusterApiError::ValidationError(_) => "ValidationError",
            ClusterApiError::ApplyConflict(_) => "ApplyConflict",
            ClusterApiError::NotFound(_) => "NotFound",
            ClusterApiError::NodeBusy(_) => "NodeBusy",
            ClusterApiError::Unexpected(_) => "Unexpected",
        }
    }

    pub fn from_kube(what: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => Self::from_status(what, resp.code, &resp.message),
            other => ClusterApiError::ApiUnavailable(format!("{what}: {other}")),
        }
    }

    pub fn from_status(what: &str, code: u16, message: &str) -> Self {
        let detail = format!("{what}: {message}");
        match code {
            401 | 403 => ClusterApiError::ApiUnavailable(detail),
            404 => ClusterApiError::NotFound(detail),
            409 => ClusterApiError::ApplyConflict(detail),
            400 | 422 => ClusterApiError::ValidationError(detail),
            429 => ClusterApiError::NodeBusy(detail),
            500..=599 => ClusterApiError::ApiUnavailable(detail),
            _ => ClusterApiError::Unexpected(format!("{detail} (HTTP {code})")),
        }
    }

    pub fn timed_out(what: &str, after: std::time::Duration) -> Self {
        ClusterApiError::ApiUnavailable(format!("{what}: timed out after {}s", after.as_secs_f32()))
    }
}
