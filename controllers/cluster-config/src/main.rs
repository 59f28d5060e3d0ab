//! SR-IOV FEC Cluster Config Controller
//!
//! Watches the `SriovFecClusterConfig` named `config` in the operator
//! namespace and keeps one `SriovFecNodeConfig` per accelerator node in sync
//! with it. The per-node daemons pick the node configs up from there.

mod controller;
mod error;
mod metrics;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting SR-IOV FEC Cluster Config Controller");

    // Load configuration from environment variables
    let namespace = env::var("NAMESPACE").unwrap_or_else(|_| "default".to_string());
    let metrics_bind_addr: SocketAddr = env::var("METRICS_BIND_ADDR")
        .unwrap_or_else(|_| metrics::DEFAULT_METRICS_BIND_ADDR.to_string())
        .parse()
        .map_err(|e| ControllerError::InvalidConfig(format!("METRICS_BIND_ADDR is not a socket address: {}", e)))?;

    info!("Configuration:");
    info!("  Namespace: {}", namespace);
    info!("  Metrics endpoint: {}", metrics_bind_addr);

    let controller = Controller::new(namespace, metrics_bind_addr).await?;
    controller.run().await?;

    Ok(())
}
