//! Typed, timeout-bounded facade over the Kubernetes API server.
//!
//! Every call is bounded by the configured deadline and never retried here;
//! retry policy belongs to the polling loops and to the user.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::client::cluster_api_error::ClusterApiError;
use crate::core::client::kube_resources::{Node, Pod, Service};
use crate::core::client::workloads::WorkloadManifest;
use crate::core::client::{deployments, namespaces, nodes, pods, services};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodCounts {
    pub total: u32,
    pub running: u32,
    pub running_by_node: HashMap<String, u32>,
}

impl PodCounts {
    pub fn from_pods(pods: &[Pod]) -> Self {
        let mut counts = PodCounts {
            total: pods.len() as u32,
            ..Default::default()
        };
        for pod in pods.iter().filter(|p| pods::pod_phase(p) == Some("Running")) {
            counts.running += 1;
            if let Some(node) = pod.spec.as_ref().and_then(|s| s.node_name.clone()) {
                *counts.running_by_node.entry(node).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub node: String,
    pub evicted: Vec<String>,
    pub skipped: Vec<String>,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn server_version(&self) -> Result<String, ClusterApiError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterApiError>;

    async fn list_services(
        &self,
        namespaces: Option<&[String]>,
    ) -> Result<Vec<Service>, ClusterApiError>;

    async fn list_pods(&self, namespace: Option<&str>) -> Result<PodCounts, ClusterApiError>;

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterApiError>;

    async fn apply_workload(&self, manifest: &WorkloadManifest) -> Result<(), ClusterApiError>;

    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), ClusterApiError>;

    async fn restart_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterApiError>;

    async fn delete_workload(
        &self,
        namespace: &str,
        name: &str,
        delete_service: bool,
    ) -> Result<(), ClusterApiError>;

    async fn drain_node(&self, name: &str) -> Result<DrainReport, ClusterApiError>;
}

pub struct KubeClusterApi {
    client: Client,
    timeout: Duration,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, ClusterApiError>
    where
        F: Future<Output = kube::Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ClusterApiError::from_kube(what, err)),
            Err(_) => Err(ClusterApiError::timed_out(what, self.timeout)),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn server_version(&self) -> Result<String, ClusterApiError> {
        let info = self
            .bounded("server version", self.client.apiserver_version())
            .await?;
        Ok(info.git_version)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterApiError> {
        self.bounded("list nodes", nodes::fetch_nodes(&self.client)).await
    }

    async fn list_services(
        &self,
        namespaces: Option<&[String]>,
    ) -> Result<Vec<Service>, ClusterApiError> {
        self.bounded(
            "list services",
            services::fetch_services(&self.client, namespaces),
        )
        .await
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<PodCounts, ClusterApiError> {
        let pods = self
            .bounded("list pods", pods::fetch_pods(&self.client, namespace))
            .await?;
        Ok(PodCounts::from_pods(&pods))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterApiError> {
        self.bounded(
            "list namespaces",
            namespaces::fetch_namespace_names(&self.client),
        )
        .await
    }

    async fn apply_workload(&self, manifest: &WorkloadManifest) -> Result<(), ClusterApiError> {
        let target = format!("{}/{}", manifest.namespace, manifest.name);

        self.bounded(
            &format!("apply deployment {target}"),
            deployments::apply_deployment(&self.client, &manifest.namespace, &manifest.deployment),
        )
        .await?;

        if let Some(service) = &manifest.service {
            self.bounded(
                &format!("apply service {target}"),
                services::apply_service(&self.client, &manifest.namespace, service),
            )
            .await?;
        }

        info!(target = %target, with_service = manifest.service.is_some(), "Workload applied");
        Ok(())
    }

    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), ClusterApiError> {
        self.bounded(
            &format!("scale deployment {namespace}/{name}"),
            deployments::scale_deployment(&self.client, namespace, name, replicas),
        )
        .await?;
        Ok(())
    }

    async fn restart_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterApiError> {
        self.bounded(
            &format!("restart deployment {namespace}/{name}"),
            deployments::restart_deployment(&self.client, namespace, name),
        )
        .await?;
        Ok(())
    }

    async fn delete_workload(
        &self,
        namespace: &str,
        name: &str,
        delete_service: bool,
    ) -> Result<(), ClusterApiError> {
        self.bounded(
            &format!("delete deployment {namespace}/{name}"),
            deployments::delete_deployment(&self.client, namespace, name),
        )
        .await?;

        if delete_service {
            match self
                .bounded(
                    &format!("delete service {namespace}/{name}"),
                    services::delete_service(&self.client, namespace, name),
                )
                .await
            {
                Ok(()) | Err(ClusterApiError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn drain_node(&self, name: &str) -> Result<DrainReport, ClusterApiError> {
        self.bounded(
            &format!("get node {name}"),
            nodes::fetch_node_by_name(&self.client, name),
        )
        .await?;

        self.bounded(
            &format!("cordon node {name}"),
            nodes::set_node_unschedulable(&self.client, name, true),
        )
        .await?;

        let on_node = self
            .bounded(
                &format!("list pods on {name}"),
                pods::fetch_pods_by_node(&self.client, name),
            )
            .await?;

        let mut report = DrainReport {
            node: name.to_string(),
            ..Default::default()
        };

        for pod in &on_node {
            let ns = pod.metadata.namespace.clone().unwrap_or_default();
            let pod_name = pod.metadata.name.clone().unwrap_or_default();
            let key = format!("{ns}/{pod_name}");

            let finished = matches!(pods::pod_phase(pod), Some("Succeeded") | Some("Failed"));
            if finished || pods::is_daemonset_pod(pod) || pods::is_mirror_pod(pod) {
                report.skipped.push(key);
                continue;
            }

            let what = format!("evict pod {key}");
            match tokio::time::timeout(self.timeout, pods::evict_pod(&self.client, &ns, &pod_name))
                .await
            {
                Ok(Ok(())) => report.evicted.push(key),
                // Already gone between the list and the eviction.
                Ok(Err(kube::Error::Api(resp))) if resp.code == 404 => {
                    debug!(pod = %key, "Pod vanished before eviction");
                }
                Ok(Err(kube::Error::Api(resp))) if resp.code == 429 => {
                    warn!(node = %name, pod = %key, "Eviction blocked by disruption budget");
                    return Err(ClusterApiError::NodeBusy(format!(
                        "{what}: {} (evicted {} pod(s) before stopping)",
                        resp.message,
                        report.evicted.len()
                    )));
                }
                Ok(Err(err)) => return Err(ClusterApiError::from_kube(&what, err)),
                Err(_) => return Err(ClusterApiError::timed_out(&what, self.timeout)),
            }
        }

        info!(
            node = %name,
            evicted = report.evicted.len(),
            skipped = report.skipped.len(),
            "Node drained"
        );
        Ok(report)
    }
}
