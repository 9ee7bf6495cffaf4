//! Tracing setup: stderr plus a daily rolling file under the configured log dir.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::LoggingSettings;

pub const LOG_FILE_PREFIX: &str = "rpi-k8s-management.log";

/// Installs the global subscriber. The returned guard must live as long as
/// the process, otherwise buffered file output is lost on exit.
pub fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.dir)?;

    let file_appender = rolling::daily(&settings.dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over the configured level when present.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&settings.level)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}

fn default_directive(level: &str) -> String {
    format!("rpi_k8s_management={level},tower_http=info,kube=warn")
}
