pub mod poll_loop;
pub mod tasks;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::client::cluster_api::ClusterApi;
use crate::core::config::AppConfig;
use crate::core::ssh::probe_transport::ProbeTransport;
use crate::core::state::runtime::aggregation_cache::AggregationCache;
use crate::domain::hardware::service::node_prober::NodeProber;
use poll_loop::{run_poll_loop, PollTask};
use tasks::cluster::task::ClusterPollTask;
use tasks::hardware::task::HardwarePollTask;
use tasks::services::task::ServicesPollTask;

/// Starts one loop per resource kind. Every loop stops when `cancel` fires.
pub fn spawn_pollers(
    config: &AppConfig,
    api: Arc<dyn ClusterApi>,
    transport: Arc<dyn ProbeTransport>,
    cache: Arc<AggregationCache>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let cluster: Arc<dyn PollTask> = Arc::new(ClusterPollTask::new(
        api.clone(),
        cache.clone(),
        config.cluster_name.clone(),
    ));
    let services: Arc<dyn PollTask> = Arc::new(ServicesPollTask::new(
        api,
        cache.clone(),
        config.kube.service_namespaces.clone(),
    ));
    let hardware: Arc<dyn PollTask> = Arc::new(HardwarePollTask::new(
        cache.clone(),
        NodeProber::new(transport, config.ssh.clone()),
    ));

    [
        (cluster, config.polling.cluster),
        (services, config.polling.services),
        (hardware, config.polling.hardware),
    ]
    .into_iter()
    .map(|(task, schedule)| {
        tokio::spawn(run_poll_loop(
            task,
            cache.clone(),
            schedule,
            cancel.clone(),
        ))
    })
    .collect()
}
