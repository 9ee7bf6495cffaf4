use chrono::Utc;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

use crate::core::client::kube_resources::Deployment;
use crate::core::client::apply_params;

pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Server-side apply of a Deployment; creates or updates in one call
pub async fn apply_deployment(
    client: &Client,
    namespace: &str,
    deployment: &Deployment,
) -> kube::Result<Deployment> {
    let name = deployment.metadata.name.clone().unwrap_or_default();
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let applied = deployments
        .patch(&name, &apply_params(), &Patch::Apply(deployment))
        .await?;

    debug!("Applied deployment {}/{}", namespace, name);
    Ok(applied)
}

pub async fn scale_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
    replicas: i32,
) -> kube::Result<Deployment> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let patch = json!({ "spec": { "replicas": replicas } });
    let scaled = deployments
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!("Scaled deployment {}/{} to {}", namespace, name, replicas);
    Ok(scaled)
}

/// Rolling restart, the same way `kubectl rollout restart` does it
pub async fn restart_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
) -> kube::Result<Deployment> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let patch = json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": { RESTARTED_AT_ANNOTATION: Utc::now().to_rfc3339() }
                }
            }
        }
    });
    let restarted = deployments
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!("Restarted deployment {}/{}", namespace, name);
    Ok(restarted)
}

pub async fn delete_deployment(client: &Client, namespace: &str, name: &str) -> kube::Result<()> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    deployments.delete(name, &DeleteParams::default()).await?;

    debug!("Deleted deployment {}/{}", namespace, name);
    Ok(())
}
