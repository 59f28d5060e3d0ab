//! BBDev queue configuration types
//!
//! Declarative queue/bandwidth settings for the two supported accelerator
//! generations. On the wire a `BBDevConfig` carries two optional payloads;
//! exactly one of them must be populated.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue configuration for a card's physical function.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BBDevConfig {
    /// First generation (FPGA based) accelerator configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n3000: Option<N3000BBDevConfig>,

    /// Second generation accelerator configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc100: Option<ACC100BBDevConfig>,
}

/// The populated payload of a [`BBDevConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BBDevVariant<'a> {
    /// First generation payload
    N3000(&'a N3000BBDevConfig),
    /// Second generation payload
    Acc100(&'a ACC100BBDevConfig),
}

/// Errors raised when a `BBDevConfig` does not carry exactly one payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BBDevConfigError {
    /// Neither payload is set
    #[error("nil configs")]
    Missing,

    /// Both payloads are set
    #[error("both n3000 and acc100 configs are set, only one is allowed")]
    Ambiguous,
}

impl BBDevConfig {
    /// Returns the single populated payload.
    pub fn variant(&self) -> Result<BBDevVariant<'_>, BBDevConfigError> {
        match (&self.n3000, &self.acc100) {
            (Some(n3000), None) => Ok(BBDevVariant::N3000(n3000)),
            (None, Some(acc100)) => Ok(BBDevVariant::Acc100(acc100)),
            (None, None) => Err(BBDevConfigError::Missing),
            (Some(_), Some(_)) => Err(BBDevConfigError::Ambiguous),
        }
    }

    /// True when at least one payload is present.
    pub fn is_configured(&self) -> bool {
        self.n3000.is_some() || self.acc100.is_some()
    }
}

/// N3000 (FPGA) queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct N3000BBDevConfig {
    /// FPGA image type: `FPGA_5GNR` or `FPGA_LTE`
    pub network_type: String,

    /// Run the PF in PF mode (queues owned by the PF instead of VFs)
    pub pf_mode: bool,

    /// Function level reset timeout
    #[serde(rename = "flrTimeout")]
    pub flr_time_out: u32,

    /// Downlink settings
    pub downlink: UplinkDownlink,

    /// Uplink settings
    pub uplink: UplinkDownlink,
}

/// One direction (uplink or downlink) of an N3000 configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UplinkDownlink {
    pub bandwidth: u32,
    pub load_balance: u32,
    pub queues: UplinkDownlinkQueues,
}

/// Number of queues assigned to each of the eight VFs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UplinkDownlinkQueues {
    #[serde(default)]
    pub vf0: u32,
    #[serde(default)]
    pub vf1: u32,
    #[serde(default)]
    pub vf2: u32,
    #[serde(default)]
    pub vf3: u32,
    #[serde(default)]
    pub vf4: u32,
    #[serde(default)]
    pub vf5: u32,
    #[serde(default)]
    pub vf6: u32,
    #[serde(default)]
    pub vf7: u32,
}

impl UplinkDownlinkQueues {
    /// Queue counts in VF order.
    pub fn as_array(&self) -> [u32; 8] {
        [
            self.vf0, self.vf1, self.vf2, self.vf3, self.vf4, self.vf5, self.vf6, self.vf7,
        ]
    }
}

/// ACC100 queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ACC100BBDevConfig {
    /// Run the PF in PF mode
    pub pf_mode: bool,

    /// Number of VF bundles
    pub num_vf_bundles: u32,

    /// Maximum queue size
    pub max_queue_size: u32,

    #[serde(rename = "uplink4G")]
    pub uplink_4g: QueueGroupConfig,

    #[serde(rename = "downlink4G")]
    pub downlink_4g: QueueGroupConfig,

    #[serde(rename = "uplink5G")]
    pub uplink_5g: QueueGroupConfig,

    #[serde(rename = "downlink5G")]
    pub downlink_5g: QueueGroupConfig,
}

impl ACC100BBDevConfig {
    /// Sum of queue groups requested across all four 4G/5G directions,
    /// widened so oversized requests cannot wrap.
    pub fn total_queue_groups(&self) -> u64 {
        [&self.uplink_4g, &self.downlink_4g, &self.uplink_5g, &self.downlink_5g]
            .iter()
            .map(|group| u64::from(group.num_queue_groups))
            .sum()
    }
}

/// Queue group layout for one ACC100 direction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueGroupConfig {
    pub num_queue_groups: u32,
    pub num_aqs_per_groups: u32,
    pub aq_depth_log2: u32,
}
