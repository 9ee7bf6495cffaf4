use serde::Serialize;
use uuid::Uuid;

use crate::domain::deployment::model::deployment_operation::{DeploymentStatus, OperationState};

/// 202 body for every accepted mutation.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedOperation {
    pub operation_id: Uuid,
    pub status: OperationState,
}

impl From<&DeploymentStatus> for SubmittedOperation {
    fn from(op: &DeploymentStatus) -> Self {
        Self {
            operation_id: op.operation_id,
            status: op.status,
        }
    }
}
