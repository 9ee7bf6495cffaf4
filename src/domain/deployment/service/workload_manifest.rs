use std::collections::BTreeMap;

use crate::core::client::kube_resources::{
    Container, ContainerPort, Deployment, DeploymentSpec, EnvVar, IntOrString, LabelSelector,
    ObjectMeta, PodSpec, PodTemplateSpec, Quantity, ResourceRequirements, Service, ServicePort,
    ServiceSpec,
};
use crate::core::client::workloads::WorkloadManifest;
use crate::domain::deployment::dto::deployment_request::{DeploymentRequest, ResourceQuantities};

pub const APP_LABEL: &str = "app";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "rpi-k8s-management";

/// Deployment (plus optional Service) for one request. Pods are selected by
/// `app=<name>`; user labels cannot override the selector label.
pub fn build_manifest(request: &DeploymentRequest) -> WorkloadManifest {
    let mut labels = request.labels.clone();
    labels.insert(APP_LABEL.to_string(), request.name.clone());
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    let selector = BTreeMap::from([(APP_LABEL.to_string(), request.name.clone())]);

    let container = Container {
        name: request.name.clone(),
        image: Some(request.image.clone()),
        ports: request.port.map(|port| {
            vec![ContainerPort {
                container_port: port,
                ..Default::default()
            }]
        }),
        env: (!request.env.is_empty()).then(|| {
            request
                .env
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                })
                .collect()
        }),
        resources: request.resources.as_ref().map(|r| ResourceRequirements {
            requests: r.requests.as_ref().map(quantities),
            limits: r.limits.as_ref().map(quantities),
            ..Default::default()
        }),
        ..Default::default()
    };

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(request.replicas),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    node_selector: request.node_selector.clone(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let service = match (request.create_service, request.port) {
        (true, Some(port)) => Some(Service {
            metadata: ObjectMeta {
                name: Some(request.name.clone()),
                namespace: Some(request.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some(request.service_type.as_str().to_string()),
                selector: Some(selector),
                ports: Some(vec![ServicePort {
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        _ => None,
    };

    WorkloadManifest {
        namespace: request.namespace.clone(),
        name: request.name.clone(),
        deployment,
        service,
    }
}

fn quantities(q: &ResourceQuantities) -> BTreeMap<String, Quantity> {
    let mut out = BTreeMap::new();
    if let Some(cpu) = &q.cpu {
        out.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &q.memory {
        out.insert("memory".to_string(), Quantity(memory.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> DeploymentRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn selector_label_wins_over_user_labels() {
        let manifest = build_manifest(&request(json!({
            "name": "app1",
            "image": "nginx:1.27",
            "labels": { "app": "other", "team": "ml" }
        })));

        let meta_labels = manifest.deployment.metadata.labels.unwrap();
        assert_eq!(meta_labels["app"], "app1");
        assert_eq!(meta_labels["team"], "ml");

        let spec = manifest.deployment.spec.unwrap();
        assert_eq!(spec.selector.match_labels.unwrap()["app"], "app1");
        assert_eq!(spec.replicas, Some(1));
        assert!(manifest.service.is_none());
    }

    #[test]
    fn builds_container_from_request() {
        let manifest = build_manifest(&request(json!({
            "name": "api",
            "namespace": "ml",
            "image": "ghcr.io/lab/api:2",
            "replicas": 3,
            "port": 8000,
            "env": { "LOG_LEVEL": "debug" },
            "node_selector": { "kubernetes.io/arch": "arm64" },
            "resources": { "limits": { "cpu": "500m", "memory": "256Mi" } }
        })));

        assert_eq!(manifest.namespace, "ml");
        let pod = manifest.deployment.spec.unwrap().template.spec.unwrap();
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("ghcr.io/lab/api:2"));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8000);
        assert_eq!(container.env.as_ref().unwrap()[0].name, "LOG_LEVEL");
        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits["cpu"], Quantity("500m".to_string()));
        assert_eq!(pod.node_selector.unwrap()["kubernetes.io/arch"], "arm64");
    }

    #[test]
    fn service_fronts_the_container_port() {
        let manifest = build_manifest(&request(json!({
            "name": "web",
            "image": "nginx",
            "port": 80,
            "create_service": true,
            "service_type": "NodePort"
        })));

        let spec = manifest.service.unwrap().spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));
        assert_eq!(spec.selector.unwrap()["app"], "web");
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(80)));
    }
}
