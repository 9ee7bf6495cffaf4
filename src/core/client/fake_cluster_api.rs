//! In-memory `ClusterApi` and object fixtures for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::core::client::cluster_api::{ClusterApi, DrainReport, PodCounts};
use crate::core::client::cluster_api_error::ClusterApiError;
use crate::core::client::kube_resources::{
    Node, NodeAddress, NodeCondition, NodeSpec, NodeStatus, NodeSystemInfo, ObjectMeta, Quantity,
    Service, ServicePort, ServiceSpec, Taint,
};
use crate::core::client::workloads::WorkloadManifest;

pub fn k8s_node(name: &str, ready: bool, role: Option<&str>) -> Node {
    let mut labels = BTreeMap::new();
    if let Some(role) = role {
        labels.insert(format!("node-role.kubernetes.io/{role}"), "true".to_string());
    }
    let taints = role.map(|_| {
        vec![Taint {
            key: "node-role.kubernetes.io/control-plane".to_string(),
            effect: "NoSchedule".to_string(),
            ..Default::default()
        }]
    });

    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            taints,
            ..Default::default()
        }),
        status: Some(NodeStatus {
            addresses: Some(vec![
                NodeAddress {
                    address: name.to_string(),
                    type_: "Hostname".to_string(),
                },
                NodeAddress {
                    address: "192.168.1.11".to_string(),
                    type_: "InternalIP".to_string(),
                },
            ]),
            capacity: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("4".to_string())),
                ("memory".to_string(), Quantity("7901Mi".to_string())),
            ])),
            conditions: Some(vec![NodeCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            node_info: Some(NodeSystemInfo {
                architecture: "arm64".to_string(),
                kubelet_version: "v1.31.4+k3s1".to_string(),
                os_image: "Debian GNU/Linux 12 (bookworm)".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

pub fn k8s_service(namespace: &str, name: &str, port: i32) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub struct FakeClusterApi {
    pub version: Mutex<String>,
    pub nodes: Mutex<Vec<Node>>,
    pub services: Mutex<Vec<Service>>,
    pub pods: Mutex<PodCounts>,
    pub namespaces: Mutex<Vec<String>>,
    pub mutation_error: Mutex<Option<ClusterApiError>>,
    unavailable: AtomicBool,
    hold: AtomicBool,
    gate: Semaphore,
    mutations: Mutex<Vec<String>>,
    reads: AtomicUsize,
}

impl Default for FakeClusterApi {
    fn default() -> Self {
        FakeClusterApi {
            version: Mutex::new(String::new()),
            nodes: Mutex::new(Vec::new()),
            services: Mutex::new(Vec::new()),
            pods: Mutex::new(PodCounts::default()),
            namespaces: Mutex::new(Vec::new()),
            mutation_error: Mutex::new(None),
            unavailable: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            gate: Semaphore::new(0),
            mutations: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }
}

impl FakeClusterApi {
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        let fake = FakeClusterApi::default();
        *fake.version.lock().unwrap() = "v1.31.4+k3s1".to_string();
        *fake.nodes.lock().unwrap() = nodes;
        *fake.namespaces.lock().unwrap() = vec!["default".to_string(), "kube-system".to_string()];
        fake
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Mutations block until `release_mutation` is called once per call.
    pub fn hold_mutations(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_mutation(&self) {
        self.gate.add_permits(1);
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self, what: &str) -> Result<(), ClusterApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClusterApiError::ApiUnavailable(format!("{what}: connection refused")));
        }
        Ok(())
    }

    async fn mutate(&self, entry: String) -> Result<(), ClusterApiError> {
        if self.hold.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        self.mutations.lock().unwrap().push(entry);
        match self.mutation_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterApi for FakeClusterApi {
    async fn server_version(&self) -> Result<String, ClusterApiError> {
        self.read("server version")?;
        Ok(self.version.lock().unwrap().clone())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterApiError> {
        self.read("list nodes")?;
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn list_services(
        &self,
        namespaces: Option<&[String]>,
    ) -> Result<Vec<Service>, ClusterApiError> {
        self.read("list services")?;
        let services = self.services.lock().unwrap().clone();
        Ok(match namespaces {
            Some(allowed) => services
                .into_iter()
                .filter(|s| {
                    s.metadata
                        .namespace
                        .as_ref()
                        .map(|ns| allowed.contains(ns))
                        .unwrap_or(false)
                })
                .collect(),
            None => services,
        })
    }

    async fn list_pods(&self, _namespace: Option<&str>) -> Result<PodCounts, ClusterApiError> {
        self.read("list pods")?;
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterApiError> {
        self.read("list namespaces")?;
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn apply_workload(&self, manifest: &WorkloadManifest) -> Result<(), ClusterApiError> {
        self.mutate(format!("apply {}/{}", manifest.namespace, manifest.name))
            .await
    }

    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), ClusterApiError> {
        self.mutate(format!("scale {namespace}/{name} {replicas}")).await
    }

    async fn restart_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterApiError> {
        self.mutate(format!("restart {namespace}/{name}")).await
    }

    async fn delete_workload(
        &self,
        namespace: &str,
        name: &str,
        delete_service: bool,
    ) -> Result<(), ClusterApiError> {
        self.mutate(format!("delete {namespace}/{name} service={delete_service}"))
            .await
    }

    async fn drain_node(&self, name: &str) -> Result<DrainReport, ClusterApiError> {
        self.mutate(format!("drain {name}")).await?;
        Ok(DrainReport {
            node: name.to_string(),
            ..Default::default()
        })
    }
}
