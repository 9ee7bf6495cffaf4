use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::ssh::probe_error::ProbeError;
use crate::core::ssh::ssh_target::SshTarget;

/// Runs one command on a node and returns its stdout.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn exec(
        &self,
        target: &SshTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ProbeError>;

    /// Drops cached state for nodes that left the cluster.
    fn retain_nodes(&self, _names: &HashSet<String>) {}
}
