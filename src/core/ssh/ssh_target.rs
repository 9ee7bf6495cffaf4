use std::path::PathBuf;

use crate::core::config::SshSettings;

/// Where and as whom to open an SSH session for one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SshTarget {
    pub node_name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: Option<PathBuf>,
}

impl SshTarget {
    /// Per-node overrides win; otherwise the node's InternalIP with the global
    /// user, port and key. `None` when no address is known at all.
    pub fn resolve(node_name: &str, ip_address: Option<&str>, settings: &SshSettings) -> Option<Self> {
        let node_override = settings.node_overrides.get(node_name);

        let host = node_override
            .map(|o| o.host.clone())
            .or_else(|| ip_address.map(str::to_string))?;

        Some(SshTarget {
            node_name: node_name.to_string(),
            host,
            port: node_override.and_then(|o| o.port).unwrap_or(settings.port),
            user: node_override
                .and_then(|o| o.user.clone())
                .unwrap_or_else(|| settings.user.clone()),
            key_path: node_override
                .and_then(|o| o.key_path.clone())
                .or_else(|| settings.key_path.clone()),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}
