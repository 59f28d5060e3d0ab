//! Reconciliation of the SriovFecClusterConfig.
//!
//! One pass loads the honored cluster config, validates it, lists the nodes
//! that carry an Intel accelerator, renders a node config per eligible node
//! and converges the stored node configs onto that set. The pass ends by
//! writing the cluster config's status.
//!
//! - `validate`: structural checks
//! - `render`: cluster config + node inventory to node configs
//! - `sync`: delete stale, then create or update

pub mod render;
pub mod sync;
pub mod validate;

#[cfg(test)]
mod reconciler_test;

use crate::error::ControllerError;
use crate::metrics::Metrics;
use crds::{ClusterSyncStatus, DEFAULT_CLUSTER_CONFIG_NAME};
use fec_client::FecClientTrait;
use render::render_node_configs;
use tracing::{error, info, warn};
use validate::validate_cluster_config;

/// Labels the node feature discovery puts on Linux workers with an Intel PCI device.
pub const ACCELERATOR_NODE_LABELS: [(&str, &str); 3] = [
    ("node-role.kubernetes.io/worker", ""),
    ("beta.kubernetes.io/os", "linux"),
    ("feature.node.kubernetes.io/pci-8086.present", "true"),
];

const NFD_FAILURE_MESSAGE: &str = "failed to obtain nodes with Intel accelerator - check logs";
const SYNC_FAILURE_MESSAGE: &str = "failed to create NodeConfigs - check logs";

/// Terminal state of a pass that did not return an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cluster config no longer exists
    NotFound,
    /// Not the honored name/namespace
    Ignored,
    /// Structural validation failed with the given message
    InvalidConfig(String),
    /// Node configs are in sync
    NodeConfigsCreated(sync::SyncSummary),
}

/// Reconciles the cluster config into node configs.
pub struct Reconciler {
    pub(crate) fec_client: Box<dyn FecClientTrait + Send + Sync>,
    /// Operator namespace: home of the honored cluster config and of every rendered node config
    pub(crate) namespace: String,
    pub(crate) metrics: Metrics,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        fec_client: Box<dyn FecClientTrait + Send + Sync>,
        namespace: impl Into<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            fec_client,
            namespace: namespace.into(),
            metrics,
        }
    }

    /// Runs one pass for the cluster config `namespace/name`.
    ///
    /// Inventory and sync failures are recorded in the status and returned so
    /// the caller can requeue.
    pub async fn reconcile_cluster_config(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        info!("Reconciling SriovFecClusterConfig {}/{}", namespace, name);

        let Some(cluster_config) = self.fec_client.get_cluster_config(namespace, name).await? else {
            info!("SriovFecClusterConfig {}/{} not found", namespace, name);
            return Ok(ReconcileOutcome::NotFound);
        };

        if namespace != self.namespace || name != DEFAULT_CLUSTER_CONFIG_NAME {
            info!(
                "received ClusterConfig {}/{}, but it is not an expected one ({}/{}) - it'll be ignored",
                namespace, name, self.namespace, DEFAULT_CLUSTER_CONFIG_NAME
            );
            let message = format!(
                "Only SriovFecClusterConfig with name '{}' and namespace '{}' are handled",
                DEFAULT_CLUSTER_CONFIG_NAME, self.namespace
            );
            self.update_status(namespace, name, ClusterSyncStatus::Ignored, &message).await;
            return Ok(ReconcileOutcome::Ignored);
        }

        let spec = &cluster_config.spec;
        info!(
            one_node_config_for_all = spec.one_node_config_for_all,
            node_configs = spec.nodes.len(),
            "is one config for all nodes requested?"
        );

        if let Err(message) = validate_cluster_config(spec) {
            info!("invalid SriovFecClusterConfig: {}", message);
            self.update_status(namespace, name, ClusterSyncStatus::InvalidConfig, &message).await;
            return Ok(ReconcileOutcome::InvalidConfig(message));
        }

        let nodes = match self.fec_client.list_nodes(&ACCELERATOR_NODE_LABELS).await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!("failed to obtain nodes with Intel accelerator: {}", e);
                self.update_status(namespace, name, ClusterSyncStatus::NfdFailure, NFD_FAILURE_MESSAGE).await;
                return Err(ControllerError::Inventory(e));
            }
        };
        let node_names: Vec<&str> = nodes.iter().filter_map(|n| n.metadata.name.as_deref()).collect();
        info!(nodes = ?node_names, "nodes with intel accelerator");

        let targets = render_node_configs(spec, &nodes, &self.namespace);
        match self.sync_node_configs(&targets).await {
            Ok(summary) => {
                info!(
                    created = summary.created.len(),
                    updated = summary.updated.len(),
                    unchanged = summary.unchanged.len(),
                    deleted = summary.deleted.len(),
                    "node configs synced"
                );
                self.update_status(namespace, name, ClusterSyncStatus::NodeConfigsCreated, "").await;
                Ok(ReconcileOutcome::NodeConfigsCreated(summary))
            }
            Err(e) => {
                error!("syncNodeConfigs failed: {}", e);
                self.update_status(namespace, name, ClusterSyncStatus::NodeConfigsCreationFailed, SYNC_FAILURE_MESSAGE)
                    .await;
                Err(ControllerError::Sync(e))
            }
        }
    }

    /// Writes the cluster config status. Failures are logged only.
    async fn update_status(&self, namespace: &str, name: &str, sync_status: ClusterSyncStatus, message: &str) {
        self.metrics.record_reconcile(sync_status);
        if let Err(e) = self
            .fec_client
            .update_cluster_config_status(namespace, name, sync_status, message)
            .await
        {
            warn!("failed to update cluster config's status: {}", e);
        }
    }
}
