//! Daemon error types.

use fec_client::FecClientError;
use kube::Error as KubeError;
use pf_bb_config::PfBbConfigError;
use thiserror::Error;

/// Errors that can occur in the node daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubernetes API error raised through the FEC client
    #[error("FEC client error: {0}")]
    Client(#[from] FecClientError),

    /// Compiling or applying a card's BBDev config failed
    #[error("pf_bb_config error: {0}")]
    PfBbConfig(#[from] PfBbConfigError),

    /// Scanning sysfs for accelerators failed
    #[error("accelerator discovery failed: {0}")]
    Inventory(#[source] std::io::Error),

    /// Applying a card did not finish in time
    #[error("applying config to {pci_address} timed out after {seconds}s")]
    Timeout { pci_address: String, seconds: u64 },

    /// Blocking task failed to complete
    #[error("task failed: {0}")]
    Task(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DaemonError {
    /// True for failures the daemon must not outlive.
    ///
    /// A timed-out `pf_bb_config` run keeps going on the blocking pool, so the
    /// process has to exit before the card is touched again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DaemonError::Timeout { .. })
    }
}
