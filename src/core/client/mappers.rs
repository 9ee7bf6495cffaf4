/// Maps kube-rs / k8s-openapi types → domain models
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::client::kube_resources::{IntOrString, Node, Quantity, Service};
use crate::domain::catalog::known_service::KnownService;
use crate::domain::cluster::model::node_info::{NodeInfo, NodeMetrics, NodeStatus};
use crate::domain::cluster::model::service_info::{ServiceInfo, ServicePortInfo, ServiceType};

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";
const DEFAULT_POD_CAPACITY: u32 = 110;

/// Converts a k8s-openapi Node object into a NodeInfo.
/// Returns `None` for objects without a name.
pub fn map_node_to_info(node: &Node, pods_running: u32) -> Option<NodeInfo> {
    let metadata = &node.metadata;
    let name = metadata.name.clone()?;
    let status = node.status.as_ref();
    let spec = node.spec.as_ref();

    // Go through the wire format so the result does not depend on the time
    // library k8s-openapi is built with.
    let created_at = metadata
        .creation_timestamp
        .as_ref()
        .and_then(|ts| serde_json::to_value(ts).ok())
        .and_then(|v| v.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()))
        .map(|dt| dt.with_timezone(&Utc));

    let ip_address = status
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addresses| {
            addresses
                .iter()
                .find(|a| a.type_ == "InternalIP")
                .map(|a| a.address.clone())
        });

    // Extract NodeSystemInfo
    let sys_info = status.and_then(|s| s.node_info.as_ref());
    let (architecture, os_image, kernel_version, kubelet_version, container_runtime) = sys_info
        .map(|info| {
            (
                info.architecture.clone(),
                info.os_image.clone(),
                info.kernel_version.clone(),
                info.kubelet_version.clone(),
                info.container_runtime_version.clone(),
            )
        })
        .unwrap_or_default();

    let capacity = status.and_then(|s| s.capacity.as_ref());
    let allocatable = status.and_then(|s| s.allocatable.as_ref());

    let conditions: BTreeMap<String, String> = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conds| {
            conds
                .iter()
                .map(|c| (c.type_.clone(), c.status.clone()))
                .collect()
        })
        .unwrap_or_default();

    let node_status = match conditions.get("Ready").map(String::as_str) {
        Some("True") => NodeStatus::Ready,
        Some("False") => NodeStatus::NotReady,
        _ => NodeStatus::Unknown,
    };

    let labels = metadata.labels.clone().unwrap_or_default();

    let taints = spec
        .and_then(|s| s.taints.as_ref())
        .map(|t| {
            t.iter()
                .map(|taint| match taint.value.as_deref() {
                    Some(value) if !value.is_empty() => {
                        format!("{}={}:{}", taint.key, value, taint.effect)
                    }
                    _ => format!("{}:{}", taint.key, taint.effect),
                })
                .collect()
        })
        .unwrap_or_default();

    let pods_capacity = quantity(capacity, "pods")
        .and_then(|q| q.parse::<u32>().ok())
        .unwrap_or(DEFAULT_POD_CAPACITY);

    Some(NodeInfo {
        name,
        status: node_status,
        roles: roles_from_labels(&labels),
        ip_address,
        architecture,
        kubelet_version,
        os_image,
        kernel_version,
        container_runtime,
        created_at,
        labels,
        taints,
        unschedulable: spec.and_then(|s| s.unschedulable).unwrap_or(false),
        conditions,
        metrics: NodeMetrics {
            cpu_capacity: quantity(capacity, "cpu").unwrap_or_default(),
            memory_capacity: quantity(capacity, "memory").unwrap_or_default(),
            cpu_allocatable: quantity(allocatable, "cpu").unwrap_or_default(),
            memory_allocatable: quantity(allocatable, "memory").unwrap_or_default(),
            pods_running,
            pods_capacity,
        },
    })
}

fn quantity(map: Option<&BTreeMap<String, Quantity>>, key: &str) -> Option<String> {
    map.and_then(|m| m.get(key)).map(|q| q.0.clone())
}

/// `node-role.kubernetes.io/<role>` labels; `master` is reported as
/// `control-plane`, and a node without any role label is a `worker`.
pub fn roles_from_labels(labels: &BTreeMap<String, String>) -> Vec<String> {
    let mut roles: Vec<String> = labels
        .keys()
        .filter_map(|k| k.strip_prefix(ROLE_LABEL_PREFIX))
        .filter(|role| !role.is_empty())
        .map(|role| match role {
            "master" => "control-plane".to_string(),
            other => other.to_string(),
        })
        .collect();

    roles.sort();
    roles.dedup();

    if roles.is_empty() {
        roles.push("worker".to_string());
    }
    roles
}

/// Converts a k8s-openapi Service into a ServiceInfo.
pub fn map_service_to_info(service: &Service) -> Option<ServiceInfo> {
    let metadata = &service.metadata;
    let name = metadata.name.clone()?;
    let spec = service.spec.as_ref();

    let service_type = ServiceType::from_k8s(spec.and_then(|s| s.type_.as_deref()));

    let ports = spec
        .and_then(|s| s.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|p| ServicePortInfo {
                    name: p.name.clone(),
                    protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
                    port: p.port,
                    target_port: p.target_port.as_ref().map(int_or_string),
                    node_port: p.node_port,
                })
                .collect()
        })
        .unwrap_or_default();

    // First load-balancer ingress, by IP or hostname.
    let external_ip = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|i| i.ip.clone().or_else(|| i.hostname.clone()))
        .or_else(|| {
            spec.and_then(|s| s.external_ips.as_ref())
                .and_then(|ips| ips.first().cloned())
        });

    let cluster_ip = spec
        .and_then(|s| s.cluster_ip.clone())
        .filter(|ip| ip != "None");

    Some(ServiceInfo {
        app: KnownService::resolve(&name, metadata.labels.as_ref()),
        name,
        namespace: metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
        service_type,
        cluster_ip,
        ports,
        external_ip,
    })
}

fn int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::fake_cluster_api::k8s_node;
    use crate::core::client::kube_resources::{
        LoadBalancerIngress, LoadBalancerStatus, ObjectMeta, ServicePort, ServiceSpec,
        ServiceStatus,
    };

    #[test]
    fn maps_node_fields() {
        let info = map_node_to_info(&k8s_node("rpi1", true, Some("master")), 7).unwrap();

        assert_eq!(info.name, "rpi1");
        assert_eq!(info.status, NodeStatus::Ready);
        assert_eq!(info.roles, vec!["control-plane".to_string()]);
        assert_eq!(info.ip_address.as_deref(), Some("192.168.1.11"));
        assert_eq!(info.architecture, "arm64");
        assert_eq!(info.metrics.cpu_capacity, "4");
        assert_eq!(info.metrics.memory_capacity, "7901Mi");
        assert_eq!(info.metrics.pods_running, 7);
        assert_eq!(info.metrics.pods_capacity, DEFAULT_POD_CAPACITY);
        assert_eq!(info.taints, vec!["node-role.kubernetes.io/control-plane:NoSchedule".to_string()]);
    }

    #[test]
    fn node_without_ready_condition_is_unknown() {
        let mut node = k8s_node("rpi2", true, None);
        if let Some(status) = node.status.as_mut() {
            status.conditions = None;
        }
        let info = map_node_to_info(&node, 0).unwrap();
        assert_eq!(info.status, NodeStatus::Unknown);
        assert_eq!(info.roles, vec!["worker".to_string()]);
    }

    #[test]
    fn role_labels_are_normalised_and_deduplicated() {
        let labels: BTreeMap<String, String> = [
            "node-role.kubernetes.io/master",
            "node-role.kubernetes.io/control-plane",
            "node-role.kubernetes.io/etcd",
            "kubernetes.io/arch",
        ]
        .iter()
        .map(|k| (k.to_string(), "true".to_string()))
        .collect();

        assert_eq!(
            roles_from_labels(&labels),
            vec!["control-plane".to_string(), "etcd".to_string()]
        );
    }

    #[test]
    fn maps_load_balancer_service() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("grafana".to_string()),
                namespace: Some("monitoring".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("LoadBalancer".to_string()),
                cluster_ip: Some("10.43.0.20".to_string()),
                ports: Some(vec![ServicePort {
                    name: Some("http".to_string()),
                    port: 80,
                    target_port: Some(IntOrString::Int(3000)),
                    node_port: Some(31000),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: Some(ServiceStatus {
                load_balancer: Some(LoadBalancerStatus {
                    ingress: Some(vec![LoadBalancerIngress {
                        ip: Some("192.168.1.240".to_string()),
                        ..Default::default()
                    }]),
                }),
                ..Default::default()
            }),
        };

        let info = map_service_to_info(&svc).unwrap();

        assert_eq!(info.service_type, ServiceType::LoadBalancer);
        assert_eq!(info.namespace, "monitoring");
        assert_eq!(info.external_ip.as_deref(), Some("192.168.1.240"));
        assert_eq!(info.ports[0].port, 80);
        assert_eq!(info.ports[0].node_port, Some(31000));
        assert_eq!(info.ports[0].target_port.as_deref(), Some("3000"));
        assert_eq!(info.ports[0].protocol, "TCP");
        assert_eq!(info.app, KnownService::Grafana);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "LoadBalancer");
    }

    #[test]
    fn headless_service_has_no_cluster_ip() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("milvus-headless".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some("None".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let info = map_service_to_info(&svc).unwrap();
        assert_eq!(info.cluster_ip, None);
        assert_eq!(info.service_type, ServiceType::ClusterIP);
        assert_eq!(info.namespace, "default");
        assert!(info.ports.is_empty());
    }
}
