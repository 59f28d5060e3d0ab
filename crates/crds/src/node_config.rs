//! SriovFecNodeConfig CRD
//!
//! Per-node configuration derived from the cluster config. The spec is owned
//! by the cluster config controller; the status is owned by the node daemon.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::cluster_config::CardConfig;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[kube(
    group = "sriovfec.intel.com",
    version = "v1",
    kind = "SriovFecNodeConfig",
    namespaced,
    status = "SriovFecNodeConfigStatus",
    printcolumn = r#"{"name":"SyncStatus","type":"string","jsonPath":".status.syncStatus"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SriovFecNodeConfigSpec {
    /// If true, the single card config applies to every accelerator on the node
    pub one_card_config_for_all: bool,

    /// List of card configs
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SriovFecNodeConfigStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<NodeSyncStatus>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_sync_error: String,

    /// Time the daemon last finished applying the spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Node daemon sync state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum NodeSyncStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl NodeSyncStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeSyncStatus::InProgress => "InProgress",
            NodeSyncStatus::Succeeded => "Succeeded",
            NodeSyncStatus::Failed => "Failed",
        }
    }
}
