//! SriovFecClusterConfig CRD
//!
//! Cluster-wide desired state for FEC accelerators. Only one instance (name
//! `config` in the operator namespace) is honored by the controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::bbdev::BBDevConfig;

/// The only SriovFecClusterConfig name the controller acts on.
pub const DEFAULT_CLUSTER_CONFIG_NAME: &str = "config";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "sriovfec.intel.com",
    version = "v1",
    kind = "SriovFecClusterConfig",
    namespaced,
    status = "SriovFecClusterConfigStatus",
    printcolumn = r#"{"name":"SyncStatus","type":"string","jsonPath":".status.syncStatus"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SriovFecClusterConfigSpec {
    /// If true, the first node config is used for all nodes.
    /// `nodeName` is ignored and the node's single card config is used for all cards.
    pub one_node_config_for_all: bool,

    /// List of node configurations
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// Desired configuration for one node.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Name of the node (ignored when `oneNodeConfigForAll` is set)
    #[serde(default)]
    pub node_name: String,

    /// If true, the first card config is used for all cards and
    /// `pciAddress` is ignored.
    pub one_card_config_for_all: bool,

    /// List of card configs
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

/// Desired configuration for one accelerator card.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardConfig {
    /// Card's PCI address (`XXXX:XX:XX.D`)
    #[serde(default)]
    pub pci_address: String,

    /// ID of card's vendor
    #[serde(rename = "vendorID")]
    pub vendor_id: String,

    #[serde(rename = "pfDeviceID")]
    pub pf_device_id: String,

    /// Driver to bind the PF to
    pub pf_driver: String,

    #[serde(rename = "vfDeviceID")]
    pub vf_device_id: String,

    /// Driver to bind the VFs to
    pub vf_driver: String,

    /// Amount of VFs to be created
    pub vf_amount: u32,

    /// Queue configuration for the card
    #[serde(default)]
    pub bb_dev_config: BBDevConfig,
}

/// Checks a PCI address against the `XXXX:XX:XX.D` pattern (hex digits, decimal function).
pub fn is_valid_pci_address(address: &str) -> bool {
    let bytes = address.as_bytes();
    if bytes.len() != 12 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b':',
        10 => *b == b'.',
        11 => b.is_ascii_digit(),
        _ => b.is_ascii_hexdigit(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SriovFecClusterConfigStatus {
    /// Outcome of the last reconciliation pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<ClusterSyncStatus>,

    /// Error message of the last reconciliation pass (empty on success)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_sync_error: String,
}

/// Outcome of a cluster config reconciliation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ClusterSyncStatus {
    /// Not the honored name/namespace
    Ignored,
    /// Structurally invalid desired state
    InvalidConfig,
    /// Node inventory query failed
    NfdFailure,
    /// Creating, updating or deleting node configs failed
    NodeConfigsCreationFailed,
    /// Node configs are in sync
    NodeConfigsCreated,
}

impl ClusterSyncStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterSyncStatus::Ignored => "Ignored",
            ClusterSyncStatus::InvalidConfig => "InvalidConfig",
            ClusterSyncStatus::NfdFailure => "NfdFailure",
            ClusterSyncStatus::NodeConfigsCreationFailed => "NodeConfigsCreationFailed",
            ClusterSyncStatus::NodeConfigsCreated => "NodeConfigsCreated",
        }
    }
}

impl std::fmt::Display for ClusterSyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
