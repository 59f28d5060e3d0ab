//! SR-IOV FEC Node Daemon
//!
//! Runs on every accelerator node. Watches the node's `SriovFecNodeConfig`,
//! programs each card's queues with `pf_bb_config` and reports the result in
//! the node config's status. Deleting the node config stops `pf_bb_config`
//! for its cards.

mod config;
mod daemon;
mod error;
mod inventory;
mod watcher;

use crate::config::DaemonConfig;
use crate::daemon::NodeDaemon;
use crate::error::DaemonError;
use crate::watcher::Watcher;
use crds::SriovFecNodeConfig;
use fec_client::FecClient;
use kube::{Api, Client};
use pf_bb_config::{PfBbConfigController, ToolInvoker};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting SR-IOV FEC Node Daemon");

    let config = DaemonConfig::from_env()?;
    info!("Configuration:");
    info!("  Node: {}", config.node_name);
    info!("  Namespace: {}", config.namespace);
    info!("  Workdir: {}", config.workdir.display());
    info!("  pf_bb_config: {}", config.pf_bb_config_path.display());
    info!("  sysfs: {}", config.sysfs_root.display());
    info!("  Apply timeout: {:?}", config.apply_timeout);

    let kube_client = Client::try_default().await?;
    let applier = PfBbConfigController::new(
        ToolInvoker::new(&config.pf_bb_config_path),
        &config.workdir,
        config.vfio_token.clone(),
    );

    let daemon = Arc::new(NodeDaemon::new(
        Box::new(FecClient::new(kube_client.clone())),
        Arc::new(applier),
        config.node_name.clone(),
        config.namespace.clone(),
        &config.sysfs_root,
        config.apply_timeout,
    ));

    let node_config_api: Api<SriovFecNodeConfig> = Api::namespaced(kube_client, &config.namespace);
    Watcher::new(daemon, node_config_api).watch_node_config().await
}
