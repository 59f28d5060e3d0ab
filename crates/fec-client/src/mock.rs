//! Mock FecClient for unit testing
//!
//! Stores resources in memory, records every mutating call in order and can
//! be told to fail specific operations.

use crate::error::FecClientError;
use crate::fec_trait::FecClientTrait;
use crds::{
    ClusterSyncStatus, NodeSyncStatus, SriovFecClusterConfig, SriovFecClusterConfigStatus, SriovFecNodeConfig,
    SriovFecNodeConfigStatus,
};
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations recorded by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    UpdateStatus,
    UpdateNodeStatus,
    ListNodes,
    ListNodeConfigs,
    GetNodeConfig,
    Create,
    Replace,
    Delete,
}

/// One recorded call: the operation and the object name it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: MockOperation,
    pub name: String,
}

impl MockCall {
    pub fn new(operation: MockOperation, name: impl Into<String>) -> Self {
        Self {
            operation,
            name: name.into(),
        }
    }
}

type Key = (String, String);

/// In-memory stand-in for the Kubernetes API.
#[derive(Debug, Clone, Default)]
pub struct MockFecClient {
    cluster_configs: Arc<Mutex<BTreeMap<Key, SriovFecClusterConfig>>>,
    node_configs: Arc<Mutex<BTreeMap<Key, SriovFecNodeConfig>>>,
    // Each node is stored with its labels for selector matching
    nodes: Arc<Mutex<Vec<Node>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    // (operation, object name or None for any name)
    failures: Arc<Mutex<Vec<(MockOperation, Option<String>)>>>,
    resource_version: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl MockFecClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cluster config to the mock store (for test setup)
    pub fn add_cluster_config(&self, config: SriovFecClusterConfig) {
        let namespace = config.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = config.metadata.name.clone().unwrap_or_default();
        lock(&self.cluster_configs).insert((namespace, name), config);
    }

    /// Add a node to the mock store (for test setup)
    pub fn add_node(&self, node: Node) {
        lock(&self.nodes).push(node);
    }

    /// Remove a node from the mock store by name
    pub fn remove_node(&self, name: &str) {
        lock(&self.nodes).retain(|n| n.metadata.name.as_deref() != Some(name));
    }

    /// Add a node config directly, bypassing call recording (for test setup)
    pub fn add_node_config(&self, config: SriovFecNodeConfig) {
        let namespace = config.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = config.metadata.name.clone().unwrap_or_default();
        lock(&self.node_configs).insert((namespace, name), config);
    }

    /// Make every future `operation` fail, optionally only for one object name
    pub fn fail_on(&self, operation: MockOperation, name: Option<&str>) {
        lock(&self.failures).push((operation, name.map(str::to_string)));
    }

    /// Clear injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Recorded calls of one operation kind
    pub fn calls_of(&self, operation: MockOperation) -> Vec<MockCall> {
        self.calls().into_iter().filter(|c| c.operation == operation).collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Stored node config, if any
    pub fn node_config(&self, namespace: &str, name: &str) -> Option<SriovFecNodeConfig> {
        lock(&self.node_configs).get(&key(namespace, name)).cloned()
    }

    /// Names of all stored node configs, sorted
    pub fn node_config_names(&self) -> Vec<String> {
        lock(&self.node_configs).keys().map(|(_, name)| name.clone()).collect()
    }

    /// Current status of a stored cluster config
    pub fn cluster_config_status(&self, namespace: &str, name: &str) -> Option<SriovFecClusterConfigStatus> {
        lock(&self.cluster_configs)
            .get(&key(namespace, name))
            .and_then(|c| c.status.clone())
    }

    fn record(&self, operation: MockOperation, name: &str) -> Result<(), FecClientError> {
        lock(&self.calls).push(MockCall::new(operation, name));
        let failing = lock(&self.failures)
            .iter()
            .any(|(op, target)| *op == operation && target.as_deref().is_none_or(|t| t == name));
        if failing {
            return Err(FecClientError::Api(format!("injected {:?} failure for '{}'", operation, name)));
        }
        Ok(())
    }

    fn next_resource_version(&self) -> String {
        let mut version = lock(&self.resource_version);
        *version += 1;
        version.to_string()
    }

    fn node_matches(node: &Node, labels: &[(&str, &str)]) -> bool {
        let node_labels = node.metadata.labels.clone().unwrap_or_default();
        labels
            .iter()
            .all(|(k, v)| node_labels.get(*k).map(String::as_str) == Some(*v))
    }
}

#[async_trait::async_trait]
impl FecClientTrait for MockFecClient {
    async fn get_cluster_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecClusterConfig>, FecClientError> {
        Ok(lock(&self.cluster_configs).get(&key(namespace, name)).cloned())
    }

    async fn update_cluster_config_status(&self, namespace: &str, name: &str, sync_status: ClusterSyncStatus, last_sync_error: &str) -> Result<(), FecClientError> {
        self.record(MockOperation::UpdateStatus, name)?;
        let mut configs = lock(&self.cluster_configs);
        let config = configs
            .get_mut(&key(namespace, name))
            .ok_or_else(|| FecClientError::NotFound(format!("SriovFecClusterConfig {}/{}", namespace, name)))?;
        config.status = Some(SriovFecClusterConfigStatus {
            sync_status: Some(sync_status),
            last_sync_error: last_sync_error.to_string(),
        });
        Ok(())
    }

    async fn list_nodes(&self, labels: &[(&str, &str)]) -> Result<Vec<Node>, FecClientError> {
        self.record(MockOperation::ListNodes, "")?;
        Ok(lock(&self.nodes)
            .iter()
            .filter(|n| Self::node_matches(n, labels))
            .cloned()
            .collect())
    }

    async fn list_node_configs(&self) -> Result<Vec<SriovFecNodeConfig>, FecClientError> {
        self.record(MockOperation::ListNodeConfigs, "")?;
        Ok(lock(&self.node_configs).values().cloned().collect())
    }

    async fn get_node_config(&self, namespace: &str, name: &str) -> Result<Option<SriovFecNodeConfig>, FecClientError> {
        self.record(MockOperation::GetNodeConfig, name)?;
        Ok(self.node_config(namespace, name))
    }

    async fn create_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError> {
        let namespace = config.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = config
            .metadata
            .name
            .clone()
            .ok_or_else(|| FecClientError::InvalidResource("SriovFecNodeConfig missing name".to_string()))?;
        self.record(MockOperation::Create, &name)?;

        let mut configs = lock(&self.node_configs);
        if configs.contains_key(&key(&namespace, &name)) {
            return Err(FecClientError::Api(format!("SriovFecNodeConfig {}/{} already exists", namespace, name)));
        }
        let mut stored = config.clone();
        stored.metadata.resource_version = Some(self.next_resource_version());
        configs.insert((namespace, name), stored.clone());
        Ok(stored)
    }

    async fn replace_node_config(&self, config: &SriovFecNodeConfig) -> Result<SriovFecNodeConfig, FecClientError> {
        let namespace = config.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = config
            .metadata
            .name
            .clone()
            .ok_or_else(|| FecClientError::InvalidResource("SriovFecNodeConfig missing name".to_string()))?;
        self.record(MockOperation::Replace, &name)?;

        let mut configs = lock(&self.node_configs);
        let existing = configs
            .get(&key(&namespace, &name))
            .ok_or_else(|| FecClientError::NotFound(format!("SriovFecNodeConfig {}/{}", namespace, name)))?;
        if existing.metadata.resource_version != config.metadata.resource_version {
            return Err(FecClientError::Api(format!("conflict updating SriovFecNodeConfig {}/{}", namespace, name)));
        }
        let mut stored = config.clone();
        stored.metadata.resource_version = Some(self.next_resource_version());
        configs.insert((namespace, name), stored.clone());
        Ok(stored)
    }

    async fn delete_node_config(&self, namespace: &str, name: &str) -> Result<(), FecClientError> {
        self.record(MockOperation::Delete, name)?;
        lock(&self.node_configs).remove(&key(namespace, name));
        Ok(())
    }

    async fn update_node_config_status(&self, namespace: &str, name: &str, sync_status: NodeSyncStatus, last_sync_error: &str) -> Result<(), FecClientError> {
        self.record(MockOperation::UpdateNodeStatus, name)?;
        let mut configs = lock(&self.node_configs);
        let config = configs
            .get_mut(&key(namespace, name))
            .ok_or_else(|| FecClientError::NotFound(format!("SriovFecNodeConfig {}/{}", namespace, name)))?;
        config.status = Some(SriovFecNodeConfigStatus {
            sync_status: Some(sync_status),
            last_sync_error: last_sync_error.to_string(),
            last_sync_time: Some(chrono::Utc::now()),
        });
        Ok(())
    }
}
