use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Namespace;

/// Sorted namespace names, skipping namespaces that are being torn down.
pub async fn fetch_namespace_names(client: &Client) -> kube::Result<Vec<String>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let list = api.list(&ListParams::default()).await?;

    let mut names: Vec<String> = list
        .items
        .into_iter()
        .filter(|ns| !is_terminating(ns))
        .filter_map(|ns| ns.metadata.name)
        .collect();
    names.sort();

    debug!("Discovered {} namespace(s)", names.len());
    Ok(names)
}

fn is_terminating(ns: &Namespace) -> bool {
    ns.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == "Terminating")
        .unwrap_or(false)
}
