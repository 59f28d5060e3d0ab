//! Controller-specific error types.

use fec_client::FecClientError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the cluster config controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubernetes API error raised through the FEC client
    #[error("FEC client error: {0}")]
    Client(#[from] FecClientError),

    /// Listing nodes with an accelerator failed
    #[error("failed to obtain nodes with Intel accelerator: {0}")]
    Inventory(#[source] FecClientError),

    /// Deleting, creating or updating node configs failed
    #[error("failed to sync SriovFecNodeConfigs: {0}")]
    Sync(#[source] FecClientError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registration or endpoint failure
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl From<prometheus::Error> for ControllerError {
    fn from(e: prometheus::Error) -> Self {
        ControllerError::Metrics(e.to_string())
    }
}
