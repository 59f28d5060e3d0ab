//! Daemon configuration from environment variables.

use crate::error::DaemonError;
use pf_bb_config::{DEFAULT_WORKDIR, PF_BB_CONFIG_PATH};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SYSFS_ROOT: &str = "/sys";
const DEFAULT_APPLY_TIMEOUT_SECS: u64 = 60;

/// Settings of one daemon instance.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Node this daemon runs on, and the name of its SriovFecNodeConfig
    pub node_name: String,
    pub namespace: String,
    /// Token passed to `pf_bb_config` for PFs bound to `vfio-pci`
    pub vfio_token: String,
    pub workdir: PathBuf,
    pub pf_bb_config_path: PathBuf,
    pub sysfs_root: PathBuf,
    pub apply_timeout: Duration,
}

impl DaemonConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, DaemonError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. A missing
    /// `SRIOV_FEC_VFIO_TOKEN` gets a freshly generated token.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DaemonError> {
        let node_name = lookup("NODE_NAME")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DaemonError::InvalidConfig("NODE_NAME environment variable is required".to_string()))?;

        let apply_timeout = match lookup("APPLY_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                DaemonError::InvalidConfig(format!("APPLY_TIMEOUT_SECS '{}' is not a number of seconds: {}", raw, e))
            })?,
            None => DEFAULT_APPLY_TIMEOUT_SECS,
        };

        Ok(Self {
            node_name,
            namespace: lookup("NAMESPACE").unwrap_or_else(|| "default".to_string()),
            vfio_token: lookup("SRIOV_FEC_VFIO_TOKEN").unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            workdir: lookup("SRIOV_FEC_WORKDIR").map_or_else(|| PathBuf::from(DEFAULT_WORKDIR), PathBuf::from),
            pf_bb_config_path: lookup("PF_BB_CONFIG_PATH").map_or_else(|| PathBuf::from(PF_BB_CONFIG_PATH), PathBuf::from),
            sysfs_root: lookup("SYSFS_ROOT").map_or_else(|| PathBuf::from(DEFAULT_SYSFS_ROOT), PathBuf::from),
            apply_timeout: Duration::from_secs(apply_timeout),
        })
    }
}
