pub mod app_config;

pub use app_config::{
    AppConfig, ConfigError, KubeSettings, LoggingSettings, OrchestratorSettings, PollSchedule,
    PollingSettings, SshNodeOverride, SshSettings,
};
