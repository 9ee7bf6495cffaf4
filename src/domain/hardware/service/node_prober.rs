use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::core::config::SshSettings;
use crate::core::ssh::probe_error::ProbeError;
use crate::core::ssh::probe_transport::ProbeTransport;
use crate::core::ssh::ssh_target::SshTarget;
use crate::domain::hardware::model::hardware_info::{HardwareMetrics, NodeHardwareInfo};
use crate::domain::hardware::service::probe_parser::{parse_probe_output, PROBE_SCRIPT};

/// A node to probe this cycle.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub node_name: String,
    pub ip_address: Option<String>,
    /// Carried from the previous hardware snapshot.
    pub last_seen: Option<DateTime<Utc>>,
}

pub struct NodeProber {
    transport: Arc<dyn ProbeTransport>,
    settings: SshSettings,
}

impl NodeProber {
    pub fn new(transport: Arc<dyn ProbeTransport>, settings: SshSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Probes every node concurrently. Each probe has its own deadline and a
    /// failure only affects that node's record.
    pub async fn probe_all(&self, requests: Vec<ProbeRequest>) -> Vec<NodeHardwareInfo> {
        let names: HashSet<String> = requests.iter().map(|r| r.node_name.clone()).collect();
        self.transport.retain_nodes(&names);

        let concurrency = self
            .settings
            .concurrency
            .unwrap_or(requests.len())
            .max(1);

        stream::iter(requests)
            .map(|request| self.probe_one(request))
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn probe_one(&self, request: ProbeRequest) -> NodeHardwareInfo {
        match self.run_probe(&request).await {
            Ok(metrics) => {
                debug!(node = %request.node_name, "Hardware probe succeeded");
                NodeHardwareInfo::online(&request.node_name, request.ip_address, metrics, Utc::now())
            }
            Err(err) => {
                warn!(
                    node = %request.node_name,
                    kind = err.kind(),
                    error = %err,
                    "Hardware probe failed"
                );
                NodeHardwareInfo::offline(
                    &request.node_name,
                    request.ip_address,
                    err.to_string(),
                    request.last_seen,
                )
            }
        }
    }

    async fn run_probe(
        &self,
        request: &ProbeRequest,
    ) -> Result<HardwareMetrics, ProbeError> {
        let target = SshTarget::resolve(
            &request.node_name,
            request.ip_address.as_deref(),
            &self.settings,
        )
        .ok_or(ProbeError::NoAddress)?;

        let deadline = self.settings.probe_timeout;
        let output = tokio::time::timeout(
            deadline,
            self.transport.exec(&target, PROBE_SCRIPT, deadline),
        )
        .await
        .map_err(|_| ProbeError::Timeout(deadline))??;

        parse_probe_output(&output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::hardware::model::hardware_info::HardwareOverview;

    const HEALTHY_OUTPUT: &str = "\
@@thermal
50000
@@throttled
throttled=0x0
@@stat
cpu  100 0 100 800 0 0 0 0
cpu  120 0 120 860 0 0 0 0
@@meminfo
MemTotal: 1000 kB
MemAvailable: 600 kB
@@df
Filesystem 1024-blocks Used Available Capacity Mounted on
/dev/mmcblk0p2 100 40 60 40% /
";

    enum Behavior {
        Output(&'static str),
        Hang,
        Refuse,
    }

    #[derive(Default)]
    struct FakeTransport {
        behaviors: HashMap<String, Behavior>,
        retained: Mutex<Option<HashSet<String>>>,
    }

    impl FakeTransport {
        fn with(mut self, node: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(node.to_string(), behavior);
            self
        }
    }

    #[async_trait]
    impl ProbeTransport for FakeTransport {
        async fn exec(
            &self,
            target: &SshTarget,
            _command: &str,
            _timeout: Duration,
        ) -> Result<String, ProbeError> {
            match self.behaviors.get(&target.node_name) {
                Some(Behavior::Output(out)) => Ok(out.to_string()),
                Some(Behavior::Hang) => std::future::pending().await,
                Some(Behavior::Refuse) | None => {
                    Err(ProbeError::ConnectionFailed("connection refused".into()))
                }
            }
        }

        fn retain_nodes(&self, names: &HashSet<String>) {
            *self.retained.lock().unwrap() = Some(names.clone());
        }
    }

    fn settings() -> SshSettings {
        SshSettings {
            user: "pi".into(),
            key_path: None,
            port: 22,
            probe_timeout: Duration::from_secs(8),
            concurrency: None,
            node_overrides: HashMap::new(),
        }
    }

    fn request(name: &str, ip: Option<&str>) -> ProbeRequest {
        ProbeRequest {
            node_name: name.into(),
            ip_address: ip.map(str::to_string),
            last_seen: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_node_is_offline_and_excluded_from_averages() {
        let transport = FakeTransport::default()
            .with("rpi1", Behavior::Output(HEALTHY_OUTPUT))
            .with("rpi2", Behavior::Output(HEALTHY_OUTPUT))
            .with("rpi3", Behavior::Hang);
        let prober = NodeProber::new(Arc::new(transport), settings());

        let nodes = prober
            .probe_all(vec![
                request("rpi1", Some("192.168.1.11")),
                request("rpi2", Some("192.168.1.12")),
                request("rpi3", Some("192.168.1.13")),
            ])
            .await;
        let overview = HardwareOverview::from_nodes(nodes);

        assert_eq!(overview.total_nodes, 3);
        assert_eq!(overview.online_nodes, 2);
        assert_eq!(overview.average_cpu_usage, 40.0);
        assert_eq!(overview.average_memory_usage, 40.0);
        assert_eq!(overview.average_temperature, Some(50.0));

        let rpi3 = serde_json::to_value(&overview.nodes[2]).unwrap();
        assert_eq!(rpi3["node_name"], "rpi3");
        assert_eq!(rpi3["online"], false);
        assert!(rpi3.get("metrics").is_none());
        assert_eq!(rpi3["error"], "probe timed out after 8s");
    }

    #[tokio::test]
    async fn node_without_address_is_offline() {
        let prober = NodeProber::new(Arc::new(FakeTransport::default()), settings());

        let nodes = prober.probe_all(vec![request("ghost", None)]).await;

        assert!(!nodes[0].online);
        assert_eq!(nodes[0].error.as_deref(), Some("no SSH address known for node"));
    }

    #[tokio::test]
    async fn failure_keeps_previous_last_seen() {
        let seen = Utc::now();
        let prober = NodeProber::new(
            Arc::new(FakeTransport::default().with("rpi4", Behavior::Refuse)),
            settings(),
        );
        let mut req = request("rpi4", Some("192.168.1.14"));
        req.last_seen = Some(seen);

        let nodes = prober.probe_all(vec![req]).await;

        assert!(!nodes[0].online);
        assert_eq!(nodes[0].last_seen, Some(seen));
        assert!(nodes[0].metrics.is_none());
    }

    #[tokio::test]
    async fn probe_round_forgets_departed_nodes() {
        let transport = Arc::new(FakeTransport::default());
        let prober = NodeProber::new(transport.clone(), settings());

        prober
            .probe_all(vec![request("rpi1", Some("192.168.1.11"))])
            .await;

        let retained = transport.retained.lock().unwrap().clone().unwrap();
        assert_eq!(retained, HashSet::from(["rpi1".to_string()]));
    }
}
