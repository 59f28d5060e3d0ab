//! FEC client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum FecClientError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource is missing a field the caller relies on
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Injected or otherwise unclassified API failure
    #[error("API error: {0}")]
    Api(String),
}
