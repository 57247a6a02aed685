//! Kubeplex Transcoder
//!
//! Drop-in replacement for the media server's transcoder binary that runs
//! each transcode in its own Kubernetes pod.
//!
//! Architecture:
//! - Configuration: Load settings from the environment
//! - Arguments: Point callback URLs at the server's cluster address
//! - Signals: Turn SIGINT/SIGTERM into a cancellation event
//! - Lifecycle: Submit the worker pod, wait for it, delete it
//!
//! The process exits 0 once the worker pod has been cleaned up, whatever
//! the worker's outcome; the outcome itself is only reported in the logs.

mod args;
mod config;
mod lifecycle;
mod signals;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::lifecycle::LifecycleController;
use crate::signals::CancellationBridge;
use kubeplex_client::{ClusterConfig, KubeClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout belongs to the media server
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kubeplex_transcoder=info,kubeplex_client=info,kubeplex_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run() -> Result<()> {
    let config = Config::from_env().context("Error loading configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: namespace={}, pod_name={}",
        config.namespace, config.pod_name
    );

    let mut argv = args::collect_args(std::env::args_os())?;
    args::rewrite_args(&mut argv, &config.pms_internal_address);

    let cluster = match &config.api_url {
        Some(url) => ClusterConfig::from_url(url.clone()),
        None => ClusterConfig::in_cluster().context("Error building kubeconfig")?,
    };

    let client = KubeClient::from_config(&cluster, config.request_timeout)
        .context("Error building kubernetes client")?;
    info!("Kubernetes client initialized for {}", client.base_url());

    let cwd = std::env::current_dir().context("Error getting working directory")?;
    let cwd = cwd
        .into_os_string()
        .into_string()
        .map_err(|dir| anyhow::anyhow!("working directory is not valid UTF-8: {:?}", dir))?;

    let (bridge, cancellation) = CancellationBridge::new();
    let _signal_listener = bridge
        .listen()
        .context("Error registering signal handlers")?;

    let controller = LifecycleController::new(Arc::new(client), config);
    let report = controller.run(&cwd, &argv, cancellation).await?;

    match &report.pod_name {
        Some(name) => info!("Transcode in pod {} finished: {}", name, report.outcome),
        None => info!("Transcode finished without a worker pod: {}", report.outcome),
    }

    Ok(())
}
