//! Kubernetes-backed implementation of [`FecClientTrait`].

use crate::error::FecClientError;
use crate::fec_trait::{label_selector, FecClientTrait};
use crds::{ClusterSyncStatus, NodeSyncStatus, SriovFecClusterConfig, SriovFecNodeConfig};
use k8s_openapi::api::core::v1::Node;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::{debug, info};

/// Kubernetes API client for SR-IOV FEC resources.
#[derive(Clone)]
pub struct FecClient {
    client: Client,
}

impl std::fmt::Debug for FecClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FecClient").finish_non_exhaustive()
    }
}

impl FecClient {
    /// Wraps an existing Kubernetes client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the in-cluster or kubeconfig environment.
    pub async fn try_default() -> Result<Self, FecClientError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn node_config_api(&self, namespace: &str) -> Api<SriovFecNodeConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn node_config_namespace(config: &SriovFecNodeConfig) -> &str {
        config.metadata.namespace.as_deref().unwrap_or("default")
    }

    fn node_config_name(config: &SriovFecNodeConfig) -> Result<&str, FecClientError> {
        config
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| FecClientError::InvalidResource("SriovFecNodeConfig missing name".to_string()))
    }
}

#[async_trait::async_trait]
impl FecClientTrait for FecClient {
    async fn get_cluster_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecClusterConfig>, FecClientError> {
        let api: Api<SriovFecClusterConfig> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update_cluster_config_status(&self, namespace: &str, name: &str, sync_status: ClusterSyncStatus, last_sync_error: &str) -> Result<(), FecClientError> {
        let api: Api<SriovFecClusterConfig> = Api::namespaced(self.client.clone(), namespace);

        // Built by hand so an empty lastSyncError clears the previous message
        let status_patch = serde_json::json!({
            "status": {
                "syncStatus": sync_status.as_str(),
                "lastSyncError": last_sync_error,
            }
        });

        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        debug!("Updated SriovFecClusterConfig {}/{} status to {}", namespace, name, sync_status);
        Ok(())
    }

    async fn list_nodes(&self, labels: &[(&str, &str)]) -> Result<Vec<Node>, FecClientError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let selector = label_selector(labels);
        let nodes = api.list(&ListParams::default().labels(&selector)).await?;
        Ok(nodes.items)
    }

    async fn list_node_configs(&self) -> Result<Vec<SriovFecNodeConfig>, FecClientError> {
        let api: Api<SriovFecNodeConfig> = Api::all(self.client.clone());
        match api.list(&ListParams::default()).await {
            Ok(list) => Ok(list.items),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_node_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecNodeConfig>, FecClientError> {
        Ok(self.node_config_api(namespace).get_opt(name).await?)
    }

    async fn create_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError> {
        let namespace = Self::node_config_namespace(config);
        let created = self
            .node_config_api(namespace)
            .create(&PostParams::default(), config)
            .await?;
        info!("Created SriovFecNodeConfig {}/{}", namespace, Self::node_config_name(config)?);
        Ok(created)
    }

    async fn replace_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError> {
        let namespace = Self::node_config_namespace(config);
        let name = Self::node_config_name(config)?;
        let replaced = self
            .node_config_api(namespace)
            .replace(name, &PostParams::default(), config)
            .await?;
        info!("Updated SriovFecNodeConfig {}/{}", namespace, name);
        Ok(replaced)
    }

    async fn delete_node_config(&self, namespace: &str, name: &str) -> Result<(), FecClientError> {
        match self
            .node_config_api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => {
                info!("Deleted SriovFecNodeConfig {}/{}", namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                debug!("SriovFecNodeConfig {}/{} already gone", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_node_config_status(&self, namespace: &str, name: &str, sync_status: NodeSyncStatus, last_sync_error: &str) -> Result<(), FecClientError> {
        let status_patch = serde_json::json!({
            "status": {
                "syncStatus": sync_status.as_str(),
                "lastSyncError": last_sync_error,
                "lastSyncTime": chrono::Utc::now(),
            }
        });

        self.node_config_api(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        debug!("Updated SriovFecNodeConfig {}/{} status to {}", namespace, name, sync_status.as_str());
        Ok(())
    }
}
