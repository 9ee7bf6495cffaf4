use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Every key is read as `RPI_MGMT_<KEY>`.
pub const ENV_PREFIX: &str = "RPI_MGMT_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: format!("{ENV_PREFIX}{key}"),
            reason: reason.into(),
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cluster_name: String,
    pub cors_origins: Vec<String>,
    pub kube: KubeSettings,
    pub polling: PollingSettings,
    pub ssh: SshSettings,
    pub orchestrator: OrchestratorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct KubeSettings {
    /// Explicit kubeconfig. When unset the client is inferred
    /// (in-cluster service account, `KUBECONFIG`, then `~/.kube/config`).
    pub kubeconfig_path: Option<PathBuf>,
    pub context: Option<String>,
    pub request_timeout: Duration,
    /// Restricts the services loop to these namespaces.
    pub service_namespaces: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub jitter: Duration,
    pub stale_after: Duration,
}

impl PollSchedule {
    /// A cycle that runs past this is abandoned and recorded as failed.
    pub fn deadline(&self) -> Duration {
        self.interval * 2
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollingSettings {
    pub cluster: PollSchedule,
    pub services: PollSchedule,
    pub hardware: PollSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshNodeOverride {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SshSettings {
    pub user: String,
    pub key_path: Option<PathBuf>,
    pub port: u16,
    pub probe_timeout: Duration,
    pub concurrency: Option<usize>,
    pub node_overrides: HashMap<String, SshNodeOverride>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_replicas: i32,
    pub operation_retention: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub dir: PathBuf,
    pub level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup; `from_env` passes
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let bind_addr: SocketAddr =
            env.parse_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let jitter = Duration::from_millis(env.parse_or("POLL_JITTER_MS", 1000u64)?);
        let stale_override = env.parse_opt::<u64>("STALE_AFTER_SECS")?.map(Duration::from_secs);
        let schedule = |key: &str, default_secs: u64| -> Result<PollSchedule, ConfigError> {
            let secs: u64 = env.parse_or(key, default_secs)?;
            if secs == 0 {
                return Err(ConfigError::invalid(key, "interval must be at least one second"));
            }
            let interval = Duration::from_secs(secs);
            Ok(PollSchedule {
                interval,
                jitter,
                stale_after: stale_override.unwrap_or(interval * 3),
            })
        };

        let polling = PollingSettings {
            cluster: schedule("CLUSTER_POLL_SECS", 10)?,
            services: schedule("SERVICES_POLL_SECS", 15)?,
            hardware: schedule("HARDWARE_POLL_SECS", 15)?,
        };

        let kube = KubeSettings {
            kubeconfig_path: env.string("KUBECONFIG_PATH").map(PathBuf::from),
            context: env.string("KUBE_CONTEXT"),
            request_timeout: Duration::from_secs(env.parse_or("K8S_TIMEOUT_SECS", 5u64)?),
            service_namespaces: env.list("SERVICE_NAMESPACES"),
        };

        let ssh = SshSettings {
            user: env.string("SSH_USER").unwrap_or_else(|| "pi".to_string()),
            key_path: env.string("SSH_KEY_PATH").map(PathBuf::from),
            port: env.parse_or("SSH_PORT", 22u16)?,
            probe_timeout: Duration::from_secs(env.parse_or("SSH_TIMEOUT_SECS", 8u64)?),
            concurrency: match env.parse_opt::<usize>("PROBE_CONCURRENCY")? {
                Some(0) => {
                    return Err(ConfigError::invalid("PROBE_CONCURRENCY", "must be positive"))
                }
                other => other,
            },
            node_overrides: match env.string("SSH_NODES") {
                Some(raw) => parse_node_overrides(&raw)?,
                None => HashMap::new(),
            },
        };

        Ok(AppConfig {
            bind_addr,
            cluster_name: env
                .string("CLUSTER_NAME")
                .unwrap_or_else(|| "rpi-k8s-cluster".to_string()),
            cors_origins: env.list("CORS_ORIGINS").unwrap_or_else(|| vec!["*".to_string()]),
            kube,
            polling,
            ssh,
            orchestrator: OrchestratorSettings {
                max_replicas: match env.parse_or("MAX_REPLICAS", 10i32)? {
                    n if n < 1 => {
                        return Err(ConfigError::invalid("MAX_REPLICAS", "must be at least 1"))
                    }
                    n => n,
                },
                operation_retention: Duration::from_secs(
                    env.parse_or("OPERATION_RETENTION_SECS", 3600u64)?,
                ),
            },
            logging: LoggingSettings {
                dir: PathBuf::from(env.string("LOG_DIR").unwrap_or_else(|| "./logs".to_string())),
                level: env.string("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.string(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    fn parse_opt<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)
            .map(|raw| raw.parse::<T>().map_err(|e| ConfigError::invalid(key, e.to_string())))
            .transpose()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }
}

/// Parses `name=[user@]host[:port][#key_path]` entries separated by commas.
fn parse_node_overrides(raw: &str) -> Result<HashMap<String, SshNodeOverride>, ConfigError> {
    let mut overrides = HashMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, spec) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::invalid("SSH_NODES", format!("missing '=' in '{entry}'")))?;

        let (spec, key_path) = match spec.split_once('#') {
            Some((s, key)) => (s, Some(PathBuf::from(key))),
            None => (spec, None),
        };

        let (user, host_port) = match spec.split_once('@') {
            Some((u, rest)) => (Some(u.to_string()), rest),
            None => (None, spec),
        };

        let (host, port) = match host_port.rsplit_once(':') {
            Some((h, p)) => {
                let port = p.parse::<u16>().map_err(|_| {
                    ConfigError::invalid("SSH_NODES", format!("bad port '{p}' for node '{name}'"))
                })?;
                (h, Some(port))
            }
            None => (host_port, None),
        };

        if name.trim().is_empty() || host.is_empty() {
            return Err(ConfigError::invalid(
                "SSH_NODES",
                format!("entry '{entry}' needs both a node name and a host"),
            ));
        }

        overrides.insert(
            name.trim().to_string(),
            SshNodeOverride {
                user,
                host: host.to_string(),
                port,
                key_path,
            },
        );
    }

    Ok(overrides)
}
