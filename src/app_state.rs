use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::client::cluster_api::ClusterApi;
use crate::core::config::AppConfig;
use crate::core::state::runtime::aggregation_cache::AggregationCache;
use crate::domain::deployment::service::deployment_orchestrator::DeploymentOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<AggregationCache>,
    pub orchestrator: DeploymentOrchestrator,
    pub config: Arc<AppConfig>,
    pub started_at: DateTime<Utc>,
}

pub fn build_app_state(
    config: Arc<AppConfig>,
    api: Arc<dyn ClusterApi>,
    cache: Arc<AggregationCache>,
) -> AppState {
    AppState {
        orchestrator: DeploymentOrchestrator::new(api, cache.clone(), config.orchestrator.clone()),
        cache,
        config,
        started_at: Utc::now(),
    }
}
