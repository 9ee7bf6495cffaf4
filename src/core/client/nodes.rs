use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

use crate::core::client::kube_resources::Node;

/// Fetch all nodes in the cluster
pub async fn fetch_nodes(client: &Client) -> kube::Result<Vec<Node>> {
    let nodes: Api<Node> = Api::all(client.clone());
    let node_list = nodes.list(&ListParams::default()).await?;

    debug!("Discovered {} node(s)", node_list.items.len());
    Ok(node_list.items)
}

/// Fetch a single node by name
pub async fn fetch_node_by_name(client: &Client, name: &str) -> kube::Result<Node> {
    let nodes: Api<Node> = Api::all(client.clone());
    let node = nodes.get(name).await?;

    debug!("Fetched node: {}", name);
    Ok(node)
}

/// Marks a node (un)schedulable.
pub async fn set_node_unschedulable(
    client: &Client,
    name: &str,
    unschedulable: bool,
) -> kube::Result<Node> {
    let nodes: Api<Node> = Api::all(client.clone());
    let patch = json!({ "spec": { "unschedulable": unschedulable } });
    let node = nodes
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!("Node '{}' unschedulable={}", name, unschedulable);
    Ok(node)
}
