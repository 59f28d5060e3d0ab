//! Main controller implementation.
//!
//! Wires the FEC client, the reconciler and the metrics endpoint together and
//! runs the cluster config watcher next to the metrics server.

use crate::error::ControllerError;
use crate::metrics::{self, Metrics};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use fec_client::FecClient;
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Cluster config controller with its background tasks.
#[derive(Debug)]
pub struct Controller {
    cluster_config_watcher: JoinHandle<Result<(), ControllerError>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(namespace: String, metrics_bind_addr: SocketAddr) -> Result<Self, ControllerError> {
        info!("Initializing SR-IOV FEC cluster config controller");

        let kube_client = Client::try_default().await?;
        let metrics = Metrics::new()?;

        let reconciler = Arc::new(Reconciler::new(
            Box::new(FecClient::new(kube_client.clone())),
            namespace,
            metrics.clone(),
        ));
        let watcher = Watcher::new(kube_client, reconciler);

        let cluster_config_watcher = tokio::spawn(async move { watcher.watch_cluster_configs().await });
        let metrics_server = tokio::spawn(metrics::serve(metrics, metrics_bind_addr));

        Ok(Self {
            cluster_config_watcher,
            metrics_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("SR-IOV FEC cluster config controller running");

        // Both tasks are expected to run forever
        tokio::select! {
            result = &mut self.cluster_config_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("SriovFecClusterConfig watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("SriovFecClusterConfig watcher error: {}", e)))?;
            }
            result = &mut self.metrics_server => {
                result.map_err(|e| ControllerError::Metrics(format!("metrics endpoint panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
