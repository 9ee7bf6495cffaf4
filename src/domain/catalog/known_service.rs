//! Closed catalog of the platform services the dashboard knows how to present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnownService {
    Prometheus,
    Grafana,
    Alertmanager,
    Mlflow,
    Milvus,
    Minio,
    Argocd,
    ArgoWorkflows,
    Bentoml,
    Jupyterhub,
    KubernetesDashboard,
    Traefik,
    OtelCollector,
    Jaeger,
    Other,
}

/// Matched top to bottom. Keys that contain another key's text come first
/// (`prometheus-alertmanager` is Alertmanager, `mlflow-minio` is MinIO).
const LOOKUP: &[(&str, KnownService)] = &[
    ("alertmanager", KnownService::Alertmanager),
    ("grafana", KnownService::Grafana),
    ("argo-workflows", KnownService::ArgoWorkflows),
    ("argo-server", KnownService::ArgoWorkflows),
    ("argocd", KnownService::Argocd),
    ("kubernetes-dashboard", KnownService::KubernetesDashboard),
    ("otel-collector", KnownService::OtelCollector),
    ("opentelemetry-collector", KnownService::OtelCollector),
    ("jaeger", KnownService::Jaeger),
    ("minio", KnownService::Minio),
    ("mlflow", KnownService::Mlflow),
    ("milvus", KnownService::Milvus),
    ("bentoml", KnownService::Bentoml),
    ("jupyterhub", KnownService::Jupyterhub),
    ("proxy-public", KnownService::Jupyterhub),
    ("traefik", KnownService::Traefik),
    ("prometheus", KnownService::Prometheus),
];

const NAME_LABELS: [&str; 2] = ["app.kubernetes.io/name", "app"];

impl KnownService {
    /// Resolves from the well-known name labels first, then the service name.
    pub fn resolve(service_name: &str, labels: Option<&BTreeMap<String, String>>) -> Self {
        let from_labels = labels.into_iter().flat_map(|l| {
            NAME_LABELS
                .iter()
                .filter_map(move |key| l.get(*key).map(String::as_str))
        });

        from_labels
            .chain(std::iter::once(service_name))
            .find_map(Self::lookup)
            .unwrap_or(KnownService::Other)
    }

    fn lookup(candidate: &str) -> Option<Self> {
        let candidate = candidate.to_ascii_lowercase();
        LOOKUP
            .iter()
            .find(|(key, _)| candidate.contains(key))
            .map(|(_, service)| *service)
    }

    pub fn id(&self) -> &'static str {
        match self {
            KnownService::Prometheus => "prometheus",
            KnownService::Grafana => "grafana",
            KnownService::Alertmanager => "alertmanager",
            KnownService::Mlflow => "mlflow",
            KnownService::Milvus => "milvus",
            KnownService::Minio => "minio",
            KnownService::Argocd => "argocd",
            KnownService::ArgoWorkflows => "argo-workflows",
            KnownService::Bentoml => "bentoml",
            KnownService::Jupyterhub => "jupyterhub",
            KnownService::KubernetesDashboard => "kubernetes-dashboard",
            KnownService::Traefik => "traefik",
            KnownService::OtelCollector => "otel-collector",
            KnownService::Jaeger => "jaeger",
            KnownService::Other => "other",
        }
    }
}
