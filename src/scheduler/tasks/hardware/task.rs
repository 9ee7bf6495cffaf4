use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

use crate::core::state::runtime::aggregation_cache::{AggregationCache, ResourceKind};
use crate::domain::hardware::service::node_prober::{NodeProber, ProbeRequest};
use crate::scheduler::poll_loop::PollTask;

/// Probes every node of the latest cluster snapshot over SSH.
pub struct HardwarePollTask {
    cache: Arc<AggregationCache>,
    prober: NodeProber,
}

impl HardwarePollTask {
    pub fn new(cache: Arc<AggregationCache>, prober: NodeProber) -> Self {
        Self { cache, prober }
    }
}

#[async_trait]
impl PollTask for HardwarePollTask {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Hardware
    }

    async fn run_cycle(&self) -> Result<()> {
        let cluster = self
            .cache
            .cluster()
            .await
            .map_err(|_| anyhow!("node list not collected yet"))?;

        let last_seen: HashMap<String, _> = match self.cache.hardware().await {
            Ok(previous) => previous
                .data
                .nodes
                .iter()
                .filter_map(|n| n.last_seen.map(|at| (n.node_name.clone(), at)))
                .collect(),
            Err(_) => HashMap::new(),
        };

        let requests: Vec<ProbeRequest> = cluster
            .data
            .nodes
            .iter()
            .map(|node| ProbeRequest {
                node_name: node.name.clone(),
                ip_address: node.ip_address.clone(),
                last_seen: last_seen.get(&node.name).copied(),
            })
            .collect();

        let results = self.prober.probe_all(requests).await;
        let online = results.iter().filter(|n| n.online).count();
        info!(online, total = results.len(), "Hardware snapshot refreshed");

        self.cache.publish_hardware(results).await;
        Ok(())
    }
}
