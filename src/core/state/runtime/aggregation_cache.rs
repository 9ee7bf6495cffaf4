//! Per-resource-kind snapshot cells read by the API and written by the pollers.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, warn};

use crate::core::config::PollingSettings;
use crate::core::state::runtime::snapshot::runtime_snapshot::RuntimeSnapshot;
use crate::core::state::runtime::snapshot::runtime_snapshot_repository::RuntimeSnapshotRepository;
use crate::domain::cluster::model::cluster_info::ClusterInfo;
use crate::domain::cluster::model::node_info::NodeInfo;
use crate::domain::cluster::model::service_info::ServiceInfo;
use crate::domain::hardware::model::hardware_info::{HardwareOverview, NodeHardwareInfo};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cluster,
    Services,
    Hardware,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Cluster,
        ResourceKind::Services,
        ResourceKind::Hardware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::Services => "services",
            ResourceKind::Hardware => "hardware",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster summary and node list, published together.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub cluster: ClusterInfo,
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServicesSnapshot {
    pub services: Vec<ServiceInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStatus {
    pub kind: ResourceKind,
    /// Whether any data has ever been published.
    pub ready: bool,
    pub stale: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub stale_after_secs: u64,
}

/// Data plus the staleness metadata it was read with.
#[derive(Debug, Clone)]
pub struct CacheView<T> {
    pub data: Arc<T>,
    pub status: SnapshotStatus,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheMiss {
    #[error("{0} data has not been collected yet")]
    Cold(ResourceKind),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("refusing to publish inconsistent cluster snapshot: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleThresholds {
    pub cluster: Duration,
    pub services: Duration,
    pub hardware: Duration,
}

impl StaleThresholds {
    pub fn for_kind(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::Cluster => self.cluster,
            ResourceKind::Services => self.services,
            ResourceKind::Hardware => self.hardware,
        }
    }
}

impl From<&PollingSettings> for StaleThresholds {
    fn from(polling: &PollingSettings) -> Self {
        Self {
            cluster: polling.cluster.stale_after,
            services: polling.services.stale_after,
            hardware: polling.hardware.stale_after,
        }
    }
}

struct RefreshTriggers {
    cluster: Arc<Notify>,
    services: Arc<Notify>,
    hardware: Arc<Notify>,
}

pub struct AggregationCache {
    cluster: RuntimeSnapshotRepository<ClusterSnapshot>,
    services: RuntimeSnapshotRepository<ServicesSnapshot>,
    hardware: RuntimeSnapshotRepository<HardwareOverview>,
    /// Every node name ever published; hardware records must reference one.
    seen_nodes: RwLock<HashSet<String>>,
    thresholds: StaleThresholds,
    triggers: RefreshTriggers,
    clock: Clock,
}

impl AggregationCache {
    pub fn new(thresholds: StaleThresholds) -> Self {
        Self {
            cluster: RuntimeSnapshotRepository::new(),
            services: RuntimeSnapshotRepository::new(),
            hardware: RuntimeSnapshotRepository::new(),
            seen_nodes: RwLock::new(HashSet::new()),
            thresholds,
            triggers: RefreshTriggers {
                cluster: Arc::new(Notify::new()),
                services: Arc::new(Notify::new()),
                hardware: Arc::new(Notify::new()),
            },
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ===============================================
    // Writers (one polling task per kind)
    // ===============================================

    /// Rejects snapshots whose counts disagree; the caller records the failure.
    pub async fn publish_cluster(&self, snapshot: ClusterSnapshot) -> Result<(), PublishError> {
        let info = &snapshot.cluster;
        if !info.is_consistent() || info.node_count as usize != snapshot.nodes.len() {
            let detail = format!(
                "ready_nodes={} node_count={} listed_nodes={} running_pods={} total_pods={}",
                info.ready_nodes,
                info.node_count,
                snapshot.nodes.len(),
                info.running_pods,
                info.total_pods
            );
            return Err(PublishError::Inconsistent(detail));
        }

        {
            let mut seen = self.seen_nodes.write().await;
            seen.extend(snapshot.nodes.iter().map(|n| n.name.clone()));
        }

        let now = self.now();
        self.cluster.update(|s| s.publish(snapshot, now)).await;
        debug!(kind = "cluster", "Snapshot published");
        Ok(())
    }

    pub async fn publish_services(&self, services: Vec<ServiceInfo>) {
        let now = self.now();
        self.services
            .update(|s| s.publish(ServicesSnapshot { services }, now))
            .await;
        debug!(kind = "services", "Snapshot published");
    }

    /// Records for nodes never seen in a cluster snapshot are dropped.
    pub async fn publish_hardware(&self, nodes: Vec<NodeHardwareInfo>) {
        let (known, orphans): (Vec<_>, Vec<_>) = {
            let seen = self.seen_nodes.read().await;
            nodes.into_iter().partition(|n| seen.contains(&n.node_name))
        };
        if !orphans.is_empty() {
            warn!(
                dropped = orphans.len(),
                "Discarding hardware records for nodes never listed by the API server"
            );
        }

        let overview = HardwareOverview::from_nodes(known);
        let now = self.now();
        self.hardware.update(|s| s.publish(overview, now)).await;
        debug!(kind = "hardware", "Snapshot published");
    }

    /// Record a failed refresh; published data stays as it was.
    pub async fn mark_error(&self, kind: ResourceKind, message: String) {
        let now = self.now();
        match kind {
            ResourceKind::Cluster => self.cluster.update(|s| s.mark_error(message, now)).await,
            ResourceKind::Services => self.services.update(|s| s.mark_error(message, now)).await,
            ResourceKind::Hardware => self.hardware.update(|s| s.mark_error(message, now)).await,
        }
    }

    // ===============================================
    // Readers (API surface)
    // ===============================================

    pub async fn cluster(&self) -> Result<CacheView<ClusterSnapshot>, CacheMiss> {
        let snap = self.cluster.get().await;
        self.view(ResourceKind::Cluster, &snap)
    }

    pub async fn services(&self) -> Result<CacheView<ServicesSnapshot>, CacheMiss> {
        let snap = self.services.get().await;
        self.view(ResourceKind::Services, &snap)
    }

    pub async fn hardware(&self) -> Result<CacheView<HardwareOverview>, CacheMiss> {
        let snap = self.hardware.get().await;
        self.view(ResourceKind::Hardware, &snap)
    }

    pub async fn status(&self, kind: ResourceKind) -> SnapshotStatus {
        match kind {
            ResourceKind::Cluster => self.describe(kind, &*self.cluster.get().await),
            ResourceKind::Services => self.describe(kind, &*self.services.get().await),
            ResourceKind::Hardware => self.describe(kind, &*self.hardware.get().await),
        }
    }

    pub async fn statuses(&self) -> Vec<SnapshotStatus> {
        let mut all = Vec::with_capacity(ResourceKind::ALL.len());
        for kind in ResourceKind::ALL {
            all.push(self.status(kind).await);
        }
        all
    }

    fn view<T>(
        &self,
        kind: ResourceKind,
        snap: &RuntimeSnapshot<T>,
    ) -> Result<CacheView<T>, CacheMiss> {
        let data = snap.data.clone().ok_or(CacheMiss::Cold(kind))?;
        Ok(CacheView {
            data,
            status: self.describe(kind, snap),
        })
    }

    fn describe<T>(&self, kind: ResourceKind, snap: &RuntimeSnapshot<T>) -> SnapshotStatus {
        let stale_after = self.thresholds.for_kind(kind);
        SnapshotStatus {
            kind,
            ready: !snap.is_cold(),
            stale: snap.is_stale(self.now(), stale_after),
            last_success_at: snap.last_success_at,
            last_attempt_at: snap.last_attempt_at,
            last_error: snap.last_error.clone(),
            last_error_at: snap.last_error_at,
            consecutive_failures: snap.consecutive_failures,
            stale_after_secs: stale_after.as_secs(),
        }
    }

    // ===============================================
    // Refresh triggers
    // ===============================================

    /// Wakes the poller for `kind` now instead of at its next tick. Requests made
    /// while a cycle is running coalesce into one extra cycle.
    pub fn request_refresh(&self, kind: ResourceKind) {
        self.refresh_trigger(kind).notify_one();
    }

    pub fn refresh_trigger(&self, kind: ResourceKind) -> Arc<Notify> {
        match kind {
            ResourceKind::Cluster => self.triggers.cluster.clone(),
            ResourceKind::Services => self.triggers.services.clone(),
            ResourceKind::Hardware => self.triggers.hardware.clone(),
        }
    }
}
