use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::client::cluster_api::ClusterApi;
use crate::core::client::mappers::map_node_to_info;
use crate::core::state::runtime::aggregation_cache::{
    AggregationCache, ClusterSnapshot, ResourceKind,
};
use crate::core::state::runtime::cluster::node_roster::NodeRoster;
use crate::domain::cluster::model::cluster_info::ClusterInfo;
use crate::domain::cluster::model::node_info::NodeInfo;
use crate::scheduler::poll_loop::PollTask;

/// Refreshes the cluster summary and node list as one snapshot.
pub struct ClusterPollTask {
    api: Arc<dyn ClusterApi>,
    cache: Arc<AggregationCache>,
    cluster_name: String,
    roster: Mutex<NodeRoster>,
}

impl ClusterPollTask {
    pub fn new(api: Arc<dyn ClusterApi>, cache: Arc<AggregationCache>, cluster_name: String) -> Self {
        Self {
            api,
            cache,
            cluster_name,
            roster: Mutex::new(NodeRoster::new()),
        }
    }
}

#[async_trait]
impl PollTask for ClusterPollTask {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cluster
    }

    async fn run_cycle(&self) -> Result<()> {
        let (version, nodes, pods, namespaces) = tokio::try_join!(
            self.api.server_version(),
            self.api.list_nodes(),
            self.api.list_pods(None),
            self.api.list_namespaces(),
        )?;
        debug!(
            nodes = nodes.len(),
            pods = pods.total,
            namespaces = namespaces.len(),
            "Fetched cluster state"
        );

        let listed: Vec<NodeInfo> = nodes
            .iter()
            .filter_map(|node| {
                let running = node
                    .metadata
                    .name
                    .as_ref()
                    .and_then(|name| pods.running_by_node.get(name))
                    .copied()
                    .unwrap_or(0);
                map_node_to_info(node, running)
            })
            .collect();

        let published = self.roster.lock().await.observe(listed);
        let cluster = ClusterInfo::summarize(
            &self.cluster_name,
            &version,
            &published,
            &pods,
            &namespaces,
        );
        info!(
            node_count = cluster.node_count,
            ready_nodes = cluster.ready_nodes,
            running_pods = cluster.running_pods,
            "Cluster snapshot refreshed"
        );

        self.cache
            .publish_cluster(ClusterSnapshot {
                cluster,
                nodes: published,
            })
            .await
            .context("publish cluster snapshot")?;
        Ok(())
    }
}
