use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::client::cluster_api::PodCounts;
use crate::core::util::quantity::{format_cores, format_gib, parse_cpu_cores, parse_memory_bytes};
use crate::domain::cluster::model::node_info::NodeInfo;

/// Cluster-wide summary served by `/api/cluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub version: String,
    pub node_count: u32,
    pub ready_nodes: u32,
    pub total_cpu: String,
    pub total_memory: String,
    pub running_pods: u32,
    pub total_pods: u32,
    pub namespaces: Vec<String>,
}

impl ClusterInfo {
    /// Derives the summary from the same node list that gets published next to it,
    /// so counts can never disagree with `/api/nodes`.
    pub fn summarize(
        name: &str,
        version: &str,
        nodes: &[NodeInfo],
        pods: &PodCounts,
        namespaces: &[String],
    ) -> Self {
        let total_cores: f64 = nodes
            .iter()
            .filter_map(|n| parse_cpu_cores(&n.metrics.cpu_capacity))
            .sum();
        let total_bytes: u64 = nodes
            .iter()
            .filter_map(|n| parse_memory_bytes(&n.metrics.memory_capacity))
            .sum();

        let namespaces: BTreeSet<String> = namespaces.iter().cloned().collect();

        ClusterInfo {
            name: name.to_string(),
            version: version.to_string(),
            node_count: nodes.len() as u32,
            ready_nodes: nodes.iter().filter(|n| n.is_ready()).count() as u32,
            total_cpu: format_cores(total_cores),
            total_memory: format_gib(total_bytes),
            running_pods: pods.running,
            total_pods: pods.total,
            namespaces: namespaces.into_iter().collect(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.ready_nodes <= self.node_count && self.running_pods <= self.total_pods
    }
}
