use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One node's latest probe result. `metrics` is absent (not zeroed) when the
/// node could not be probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHardwareInfo {
    pub node_name: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Last successful probe, carried across offline cycles.
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<HardwareMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareMetrics {
    /// Celsius; `None` when the node exposes no sensor.
    pub cpu_temperature: Option<f64>,
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub throttle_status: Vec<String>,
}

impl NodeHardwareInfo {
    pub fn online(
        node_name: &str,
        ip_address: Option<String>,
        metrics: HardwareMetrics,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_name: node_name.to_string(),
            online: true,
            ip_address,
            last_seen: Some(at),
            error: None,
            metrics: Some(metrics),
        }
    }

    pub fn offline(
        node_name: &str,
        ip_address: Option<String>,
        error: String,
        last_seen: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            node_name: node_name.to_string(),
            online: false,
            ip_address,
            last_seen,
            error: Some(error),
            metrics: None,
        }
    }
}

/// Payload of `/api/hardware`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareOverview {
    pub online_nodes: u32,
    pub total_nodes: u32,
    pub average_cpu_usage: f64,
    pub average_memory_usage: f64,
    pub average_temperature: Option<f64>,
    pub nodes: Vec<NodeHardwareInfo>,
}

impl HardwareOverview {
    /// Averages only cover nodes that returned metrics; temperature only
    /// covers nodes that have a sensor.
    pub fn from_nodes(mut nodes: Vec<NodeHardwareInfo>) -> Self {
        nodes.sort_by(|a, b| a.node_name.cmp(&b.node_name));

        let reporting: Vec<&HardwareMetrics> = nodes
            .iter()
            .filter(|n| n.online)
            .filter_map(|n| n.metrics.as_ref())
            .collect();
        let temperatures: Vec<f64> = reporting.iter().filter_map(|m| m.cpu_temperature).collect();

        HardwareOverview {
            online_nodes: nodes.iter().filter(|n| n.online).count() as u32,
            total_nodes: nodes.len() as u32,
            average_cpu_usage: mean(reporting.iter().map(|m| m.cpu_usage_percent)).unwrap_or(0.0),
            average_memory_usage: mean(reporting.iter().map(|m| m.memory_usage_percent))
                .unwrap_or(0.0),
            average_temperature: mean(temperatures.into_iter()),
            nodes,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| round1(sum / count as f64))
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
