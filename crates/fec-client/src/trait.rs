//! FecClient trait for mocking
//!
//! This trait abstracts the Kubernetes API calls made by the cluster config
//! controller and the node daemon so both can be unit tested against an
//! in-memory store.

use crate::error::FecClientError;
use crds::{ClusterSyncStatus, NodeSyncStatus, SriovFecClusterConfig, SriovFecNodeConfig};
use k8s_openapi::api::core::v1::Node;

/// Kubernetes API operations needed by the FEC controllers.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait FecClientTrait: Send + Sync {
    /// Get a cluster config, `None` when it does not exist.
    async fn get_cluster_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecClusterConfig>, FecClientError>;

    /// Overwrite `syncStatus` and `lastSyncError` of a cluster config.
    async fn update_cluster_config_status(&self, namespace: &str, name: &str, sync_status: ClusterSyncStatus, last_sync_error: &str) -> Result<(), FecClientError>;

    /// List nodes carrying every given `key=value` label.
    async fn list_nodes(&self, labels: &[(&str, &str)]) -> Result<Vec<Node>, FecClientError>;

    /// List node configs across all namespaces.
    async fn list_node_configs(&self) -> Result<Vec<SriovFecNodeConfig>, FecClientError>;

    /// Get a node config, `None` when it does not exist.
    async fn get_node_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecNodeConfig>, FecClientError>;

    async fn create_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError>;

    /// Replace an existing node config. The object must carry the stored `resourceVersion`.
    async fn replace_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError>;

    async fn delete_node_config(&self, namespace: &str, name: &str) -> Result<(), FecClientError>;

    /// Overwrite `syncStatus` and `lastSyncError` of a node config and stamp `lastSyncTime`.
    async fn update_node_config_status(&self, namespace: &str, name: &str, sync_status: NodeSyncStatus, last_sync_error: &str) -> Result<(), FecClientError>;
}

/// Renders label pairs as a Kubernetes equality label selector.
pub fn label_selector(labels: &[(&str, &str)]) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
