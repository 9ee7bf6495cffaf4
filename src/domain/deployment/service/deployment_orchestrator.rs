//! Tracks mutating requests against the cluster as operations with their own
//! lifecycle, and runs each one in the background.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::core::client::cluster_api::{ClusterApi, DrainReport};
use crate::core::client::cluster_api_error::ClusterApiError;
use crate::core::client::workloads::WorkloadManifest;
use crate::core::config::OrchestratorSettings;
use crate::core::state::runtime::aggregation_cache::{AggregationCache, ResourceKind};
use crate::domain::deployment::dto::deployment_request::{
    validate_dns_label, DeploymentRequest, ScaleRequest,
};
use crate::domain::deployment::model::deployment_operation::{
    DeploymentStatus, OperationKind, OperationTarget,
};
use crate::domain::deployment::service::workload_manifest::build_manifest;

/// Hard cap on retained operations, whatever the retention period.
pub const MAX_RETAINED_OPERATIONS: usize = 500;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("operation {active} is already in progress for {target}")]
    OperationInProgress { target: String, active: Uuid },

    #[error("operation {0} not found")]
    NotFound(Uuid),
}

impl From<ValidationErrors> for OrchestratorError {
    fn from(errors: ValidationErrors) -> Self {
        OrchestratorError::Validation(errors.to_string())
    }
}

enum Mutation {
    Apply(WorkloadManifest),
    Scale {
        namespace: String,
        name: String,
        replicas: i32,
    },
    Restart {
        namespace: String,
        name: String,
    },
    Delete {
        namespace: String,
        name: String,
        delete_service: bool,
    },
    Drain {
        node: String,
    },
}

impl Mutation {
    fn kind(&self) -> OperationKind {
        match self {
            Mutation::Apply(_) => OperationKind::Deploy,
            Mutation::Scale { .. } => OperationKind::Scale,
            Mutation::Restart { .. } => OperationKind::Restart,
            Mutation::Delete { .. } => OperationKind::Delete,
            Mutation::Drain { .. } => OperationKind::Drain,
        }
    }

    fn target(&self) -> OperationTarget {
        match self {
            Mutation::Apply(m) => OperationTarget::workload(&m.namespace, &m.name),
            Mutation::Scale {
                namespace, name, ..
            }
            | Mutation::Restart { namespace, name }
            | Mutation::Delete {
                namespace, name, ..
            } => OperationTarget::workload(namespace, name),
            Mutation::Drain { node } => OperationTarget::node(node),
        }
    }
}

#[derive(Default)]
struct OperationBook {
    operations: HashMap<Uuid, DeploymentStatus>,
    active: HashMap<OperationTarget, Uuid>,
}

impl OperationBook {
    /// Drops terminal operations past retention, then the oldest terminal
    /// ones beyond the cap. Active operations are never dropped.
    fn prune(&mut self, now: DateTime<Utc>, retention: chrono::Duration) {
        self.operations.retain(|_, op| match op.finished_at {
            Some(finished) => now - finished <= retention,
            None => true,
        });

        let excess = self.operations.len().saturating_sub(MAX_RETAINED_OPERATIONS);
        if excess == 0 {
            return;
        }
        let mut terminal: Vec<(DateTime<Utc>, Uuid)> = self
            .operations
            .values()
            .filter_map(|op| op.finished_at.map(|at| (at, op.operation_id)))
            .collect();
        terminal.sort();
        for (_, id) in terminal.into_iter().take(excess) {
            self.operations.remove(&id);
        }
    }
}

#[derive(Clone)]
pub struct DeploymentOrchestrator {
    api: Arc<dyn ClusterApi>,
    cache: Arc<AggregationCache>,
    settings: OrchestratorSettings,
    book: Arc<Mutex<OperationBook>>,
}

impl DeploymentOrchestrator {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        cache: Arc<AggregationCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            api,
            cache,
            settings,
            book: Arc::new(Mutex::new(OperationBook::default())),
        }
    }

    pub fn submit_deploy(
        &self,
        request: DeploymentRequest,
    ) -> Result<DeploymentStatus, OrchestratorError> {
        request.validate()?;
        self.check_replicas(request.replicas)?;
        self.submit(Mutation::Apply(build_manifest(&request)))
    }

    pub fn submit_scale(
        &self,
        namespace: &str,
        name: &str,
        request: ScaleRequest,
    ) -> Result<DeploymentStatus, OrchestratorError> {
        check_workload_path(namespace, name)?;
        request.validate()?;
        self.check_replicas(request.replicas)?;
        self.submit(Mutation::Scale {
            namespace: namespace.to_string(),
            name: name.to_string(),
            replicas: request.replicas,
        })
    }

    pub fn submit_restart(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentStatus, OrchestratorError> {
        check_workload_path(namespace, name)?;
        self.submit(Mutation::Restart {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    pub fn submit_delete(
        &self,
        namespace: &str,
        name: &str,
        delete_service: bool,
    ) -> Result<DeploymentStatus, OrchestratorError> {
        check_workload_path(namespace, name)?;
        self.submit(Mutation::Delete {
            namespace: namespace.to_string(),
            name: name.to_string(),
            delete_service,
        })
    }

    pub fn submit_drain(&self, node: &str) -> Result<DeploymentStatus, OrchestratorError> {
        if node.trim().is_empty() {
            return Err(OrchestratorError::Validation("node name is empty".into()));
        }
        self.submit(Mutation::Drain {
            node: node.to_string(),
        })
    }

    pub fn get(&self, id: Uuid) -> Result<DeploymentStatus, OrchestratorError> {
        let mut book = self.lock_book();
        book.prune(Utc::now(), self.retention());
        book.operations
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::NotFound(id))
    }

    /// Newest first.
    pub fn list(&self) -> Vec<DeploymentStatus> {
        let mut book = self.lock_book();
        book.prune(Utc::now(), self.retention());
        let mut ops: Vec<DeploymentStatus> = book.operations.values().cloned().collect();
        ops.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        ops
    }

    fn check_replicas(&self, replicas: i32) -> Result<(), OrchestratorError> {
        if replicas > self.settings.max_replicas {
            return Err(OrchestratorError::Validation(format!(
                "replicas: {replicas} exceeds the maximum of {}",
                self.settings.max_replicas
            )));
        }
        Ok(())
    }

    fn retention(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.settings.operation_retention)
            .unwrap_or(chrono::Duration::MAX)
    }

    fn lock_book(&self) -> MutexGuard<'_, OperationBook> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers the operation as Pending and spawns its execution. Fails
    /// without side effects when the target already has an active operation.
    fn submit(&self, mutation: Mutation) -> Result<DeploymentStatus, OrchestratorError> {
        let target = mutation.target();
        let now = Utc::now();

        let pending = {
            let mut book = self.lock_book();
            book.prune(now, self.retention());

            if let Some(active) = book.active.get(&target) {
                return Err(OrchestratorError::OperationInProgress {
                    target: target.to_string(),
                    active: *active,
                });
            }

            let op = DeploymentStatus::pending(mutation.kind(), target.clone(), now);
            book.active.insert(target.clone(), op.operation_id);
            book.operations.insert(op.operation_id, op.clone());
            op
        };

        info!(
            operation_id = %pending.operation_id,
            kind = ?pending.kind,
            target = %target,
            "Operation submitted"
        );

        let this = self.clone();
        let id = pending.operation_id;
        tokio::spawn(async move { this.execute(id, target, mutation).await });

        Ok(pending)
    }

    async fn execute(self, id: Uuid, target: OperationTarget, mutation: Mutation) {
        self.update(id, |op| op.start(Utc::now()));

        let outcome = self.run(mutation).await;

        {
            let mut book = self.lock_book();
            if let Some(op) = book.operations.get_mut(&id) {
                match &outcome {
                    Ok(drain) => {
                        op.succeed(drain.clone(), Utc::now());
                    }
                    Err(err) => {
                        op.fail(err, Utc::now());
                    }
                }
            }
            if book.active.get(&target) == Some(&id) {
                book.active.remove(&target);
            }
        }

        match outcome {
            Ok(_) => info!(operation_id = %id, target = %target, "Operation succeeded"),
            Err(err) => error!(
                operation_id = %id,
                target = %target,
                kind = err.kind(),
                error = %err,
                "Operation failed"
            ),
        }

        self.cache.request_refresh(ResourceKind::Cluster);
        self.cache.request_refresh(ResourceKind::Services);
    }

    async fn run(&self, mutation: Mutation) -> Result<Option<DrainReport>, ClusterApiError> {
        match mutation {
            Mutation::Apply(manifest) => self.api.apply_workload(&manifest).await.map(|_| None),
            Mutation::Scale {
                namespace,
                name,
                replicas,
            } => self
                .api
                .scale_workload(&namespace, &name, replicas)
                .await
                .map(|_| None),
            Mutation::Restart { namespace, name } => self
                .api
                .restart_workload(&namespace, &name)
                .await
                .map(|_| None),
            Mutation::Delete {
                namespace,
                name,
                delete_service,
            } => self
                .api
                .delete_workload(&namespace, &name, delete_service)
                .await
                .map(|_| None),
            Mutation::Drain { node } => self.api.drain_node(&node).await.map(Some),
        }
    }

    fn update<F>(&self, id: Uuid, f: F)
    where
        F: FnOnce(&mut DeploymentStatus) -> bool,
    {
        let mut book = self.lock_book();
        if let Some(op) = book.operations.get_mut(&id) {
            f(op);
        }
    }
}

fn check_workload_path(namespace: &str, name: &str) -> Result<(), OrchestratorError> {
    validate_dns_label(namespace)
        .and_then(|_| validate_dns_label(name))
        .map_err(|e| {
            OrchestratorError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            )
        })
}
