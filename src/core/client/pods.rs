use kube::api::{EvictParams, ListParams};
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Pod;

/// Fetch pods across the cluster, or in one namespace when given
pub async fn fetch_pods(client: &Client, namespace: Option<&str>) -> kube::Result<Vec<Pod>> {
    let pods: Api<Pod> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let pod_list = pods.list(&ListParams::default()).await?;

    debug!(
        "Discovered {} pod(s) in {}",
        pod_list.items.len(),
        namespace.unwrap_or("all namespaces")
    );
    Ok(pod_list.items)
}

/// Fetch pods scheduled on a specific node
pub async fn fetch_pods_by_node(client: &Client, node_name: &str) -> kube::Result<Vec<Pod>> {
    let pods: Api<Pod> = Api::all(client.clone());
    let field_selector = format!("spec.nodeName={}", node_name);
    let lp = ListParams::default().fields(&field_selector);
    let pod_list = pods.list(&lp).await?;

    debug!("Found {} pod(s) on node '{}'", pod_list.items.len(), node_name);
    Ok(pod_list.items)
}

/// Evict a pod through the eviction subresource, honouring disruption budgets
pub async fn evict_pod(client: &Client, namespace: &str, name: &str) -> kube::Result<()> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    pods.evict(name, &EvictParams::default()).await?;

    debug!("Evicted pod {}/{}", namespace, name);
    Ok(())
}

pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

pub fn is_daemonset_pod(pod: &Pod) -> bool {
    pod.metadata
        .owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|r| r.kind == "DaemonSet"))
        .unwrap_or(false)
}

/// Static pods managed by the kubelet show up with this annotation.
pub fn is_mirror_pod(pod: &Pod) -> bool {
    pod.metadata
        .annotations
        .as_ref()
        .map(|a| a.contains_key("kubernetes.io/config.mirror"))
        .unwrap_or(false)
}
