/// Kubernetes resource types used by the client layer, re-exported from k8s-openapi.

pub use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, Namespace, Node, NodeAddress, NodeCondition, NodeSpec,
    NodeStatus, NodeSystemInfo, Pod, PodSpec, PodStatus, PodTemplateSpec, ResourceRequirements,
    Service, ServicePort, ServiceSpec, ServiceStatus, LoadBalancerIngress, LoadBalancerStatus,
    Taint,
};

pub use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};

pub use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
