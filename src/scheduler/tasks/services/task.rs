use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::core::client::cluster_api::ClusterApi;
use crate::core::client::mappers::map_service_to_info;
use crate::core::state::runtime::aggregation_cache::{AggregationCache, ResourceKind};
use crate::domain::cluster::model::service_info::ServiceInfo;
use crate::scheduler::poll_loop::PollTask;

pub struct ServicesPollTask {
    api: Arc<dyn ClusterApi>,
    cache: Arc<AggregationCache>,
    /// `None` watches every namespace.
    namespaces: Option<Vec<String>>,
}

impl ServicesPollTask {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        cache: Arc<AggregationCache>,
        namespaces: Option<Vec<String>>,
    ) -> Self {
        Self {
            api,
            cache,
            namespaces,
        }
    }
}

#[async_trait]
impl PollTask for ServicesPollTask {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Services
    }

    async fn run_cycle(&self) -> Result<()> {
        let raw = self.api.list_services(self.namespaces.as_deref()).await?;

        let mut services: Vec<ServiceInfo> = raw.iter().filter_map(map_service_to_info).collect();
        services.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        info!(services = services.len(), "Services snapshot refreshed");
        self.cache.publish_services(services).await;
        Ok(())
    }
}
