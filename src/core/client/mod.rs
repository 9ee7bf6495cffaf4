// Kube-rs based Kubernetes client
pub mod cluster_api;
pub mod cluster_api_error;
pub mod deployments;
pub mod kube_client;
pub mod kube_resources;
pub mod mappers;
pub mod namespaces;
pub mod nodes;
pub mod pods;
pub mod services;
pub mod workloads;

#[cfg(test)]
pub mod fake_cluster_api;

/// Field manager recorded on every server-side apply.
pub const FIELD_MANAGER: &str = "rpi-k8s-management";

/// Server-side apply without `force`: fields owned by another manager come
/// back as a 409 conflict instead of being taken over.
pub fn apply_params() -> kube::api::PatchParams {
    kube::api::PatchParams::apply(FIELD_MANAGER)
}
