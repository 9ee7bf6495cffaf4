use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::client::cluster_api::DrainReport;
use crate::core::client::cluster_api_error::ClusterApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deploy,
    Scale,
    Restart,
    Delete,
    Drain,
}

/// What an operation mutates. At most one non-terminal operation exists per target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationTarget {
    Workload { namespace: String, name: String },
    Node { name: String },
}

impl OperationTarget {
    pub fn workload(namespace: &str, name: &str) -> Self {
        OperationTarget::Workload {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn node(name: &str) -> Self {
        OperationTarget::Node {
            name: name.to_string(),
        }
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTarget::Workload { namespace, name } => write!(f, "{namespace}/{name}"),
            OperationTarget::Node { name } => write!(f, "node/{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationState {
    Pending,
    Applying,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

/// Tracked lifecycle of one mutating request, served by `/api/deployments/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentStatus {
    pub operation_id: Uuid,
    pub kind: OperationKind,
    pub target: OperationTarget,
    pub status: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain: Option<DrainReport>,
}

impl DeploymentStatus {
    pub fn pending(kind: OperationKind, target: OperationTarget, at: DateTime<Utc>) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            kind,
            target,
            status: OperationState::Pending,
            error: None,
            error_kind: None,
            submitted_at: at,
            started_at: None,
            finished_at: None,
            drain: None,
        }
    }

    /// Pending -> Applying. Returns false (and changes nothing) from any other state.
    pub fn start(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != OperationState::Pending {
            return false;
        }
        self.status = OperationState::Applying;
        self.started_at = Some(at);
        true
    }

    pub fn succeed(&mut self, drain: Option<DrainReport>, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationState::Succeeded;
        self.drain = drain;
        self.finished_at = Some(at);
        true
    }

    pub fn fail(&mut self, err: &ClusterApiError, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationState::Failed;
        self.error = Some(err.to_string());
        self.error_kind = Some(err.kind().to_string());
        self.finished_at = Some(at);
        true
    }
}
