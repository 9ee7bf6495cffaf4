use crate::core::client::kube_resources::{Deployment, Service};

/// Objects submitted together by one apply call.
#[derive(Debug, Clone)]
pub struct WorkloadManifest {
    pub namespace: String,
    pub name: String,
    pub deployment: Deployment,
    pub service: Option<Service>,
}
