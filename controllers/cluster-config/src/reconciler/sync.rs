//! Convergence of stored node configs onto the rendered set.

use super::Reconciler;
use crate::metrics::NodeConfigOperation;
use crds::SriovFecNodeConfig;
use fec_client::FecClientError;
use std::collections::HashSet;
use tracing::{debug, error, info};

/// Writes performed by one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

impl Reconciler {
    /// Deletes stale node configs, then creates or updates every target.
    ///
    /// All deletions happen before the first create or update. The first
    /// failing call aborts the sync, leaving earlier writes in place.
    pub(crate) async fn sync_node_configs(&self, targets: &[SriovFecNodeConfig]) -> Result<SyncSummary, FecClientError> {
        info!("syncing node configs");
        let mut summary = SyncSummary::default();

        summary.deleted = self.remove_old_node_configs(targets).await?;

        for target in targets {
            let name = target.metadata.name.clone().unwrap_or_default();
            match self.update_or_create_node_config(target).await {
                Ok(Some(NodeConfigOperation::Create)) => summary.created.push(name),
                Ok(Some(_)) => summary.updated.push(name),
                Ok(None) => summary.unchanged.push(name),
                Err(e) => {
                    error!("failed to sync NodeConfig {}: {}", name, e);
                    return Err(e);
                }
            }
        }

        Ok(summary)
    }

    /// Deletes every stored node config whose name is not a target.
    async fn remove_old_node_configs(&self, targets: &[SriovFecNodeConfig]) -> Result<Vec<String>, FecClientError> {
        let wanted: HashSet<&str> = targets
            .iter()
            .filter_map(|t| t.metadata.name.as_deref())
            .collect();

        let mut deleted = Vec::new();
        for existing in self.fec_client.list_node_configs().await? {
            let Some(name) = existing.metadata.name.as_deref() else {
                continue;
            };
            if wanted.contains(name) {
                continue;
            }
            let namespace = existing.metadata.namespace.as_deref().unwrap_or(&self.namespace);

            info!("deleting existing NodeConfig {}/{}", namespace, name);
            if let Err(e) = self.fec_client.delete_node_config(namespace, name).await {
                error!("failed to delete existing NodeConfig {}: {}", name, e);
                return Err(e);
            }
            self.metrics.record_node_config_operation(NodeConfigOperation::Delete);
            deleted.push(name.to_string());
        }
        Ok(deleted)
    }

    /// Creates `target` or replaces the stored spec. Returns the write that
    /// was made, `None` when the stored spec already matches.
    async fn update_or_create_node_config(&self, target: &SriovFecNodeConfig) -> Result<Option<NodeConfigOperation>, FecClientError> {
        let name = target.metadata.name.as_deref().unwrap_or_default();
        let namespace = target.metadata.namespace.as_deref().unwrap_or(&self.namespace);

        match self.fec_client.get_node_config(namespace, name).await? {
            None => {
                info!("old NodeConfig {} not found - creating", name);
                self.fec_client.create_node_config(target).await?;
                self.metrics.record_node_config_operation(NodeConfigOperation::Create);
                Ok(Some(NodeConfigOperation::Create))
            }
            Some(previous) if previous.spec == target.spec => {
                debug!("NodeConfig {} is up to date", name);
                Ok(None)
            }
            Some(mut previous) => {
                info!("previous NodeConfig {} found - updating", name);
                previous.spec = target.spec.clone();
                self.fec_client.replace_node_config(&previous).await?;
                self.metrics.record_node_config_operation(NodeConfigOperation::Update);
                Ok(Some(NodeConfigOperation::Update))
            }
        }
    }
}
