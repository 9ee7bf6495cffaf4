use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::core::config::KubeSettings;

/// Creates a Kubernetes client from an explicit kubeconfig, a named context,
/// or whatever `Config::infer` finds (in-cluster first, then local kubeconfig).
pub async fn build_kube_client(settings: &KubeSettings) -> Result<Client> {
    let options = KubeConfigOptions {
        context: settings.context.clone(),
        ..Default::default()
    };

    let mut config = match (&settings.kubeconfig_path, &settings.context) {
        (Some(path), _) => {
            debug!("Using kubeconfig at {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        (None, Some(context)) => {
            debug!("Using kubeconfig context '{}'", context);
            Config::from_kubeconfig(&options).await?
        }
        (None, None) => {
            debug!("Inferring Kubernetes configuration");
            Config::infer().await?
        }
    };

    // Transport-level bounds; every call is additionally wrapped in its own deadline.
    config.connect_timeout = Some(settings.request_timeout);
    config.read_timeout = Some(settings.request_timeout);
    config.write_timeout = Some(settings.request_timeout);

    let client = Client::try_from(config).context("building Kubernetes client")?;

    debug!("Kubernetes client initialized successfully");
    Ok(client)
}
