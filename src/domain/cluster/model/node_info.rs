use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

/// Aggregated view of one cluster node as served by `/api/nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    // --- Identity ---
    pub name: String,
    pub status: NodeStatus,
    pub roles: Vec<String>,
    pub ip_address: Option<String>,

    // --- Host Info ---
    pub architecture: String,
    pub kubelet_version: String,
    pub os_image: String,
    pub kernel_version: String,
    pub container_runtime: String,
    pub created_at: Option<DateTime<Utc>>,

    // --- Scheduling ---
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<String>,
    pub unschedulable: bool,
    /// Condition type -> status (`"True"`, `"False"`, `"Unknown"`).
    pub conditions: BTreeMap<String, String>,

    pub metrics: NodeMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Raw quantity strings as reported by the kubelet (`"4"`, `"7901Mi"`).
    pub cpu_capacity: String,
    pub memory_capacity: String,
    pub cpu_allocatable: String,
    pub memory_allocatable: String,
    pub pods_running: u32,
    pub pods_capacity: u32,
}

impl NodeInfo {
    pub fn is_ready(&self) -> bool {
        self.status == NodeStatus::Ready
    }

    /// Copy of a node that dropped out of the latest listing.
    pub fn as_unknown(&self) -> NodeInfo {
        NodeInfo {
            status: NodeStatus::Unknown,
            metrics: NodeMetrics {
                pods_running: 0,
                ..self.metrics.clone()
            },
            ..self.clone()
        }
    }
}
