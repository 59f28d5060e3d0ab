//! pf_bb_config errors

use thiserror::Error;

/// Errors raised while compiling or applying a card's queue configuration.
#[derive(Debug, Error)]
pub enum PfBbConfigError {
    /// Malformed or unsupported card configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration exceeds hardware capacity
    #[error("Validation error: {0}")]
    Validation(String),

    /// External command exited unsuccessfully
    #[error("command `{command}` failed (exit code {code:?}): {stderr}")]
    Exec {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crds::BBDevConfigError> for PfBbConfigError {
    fn from(e: crds::BBDevConfigError) -> Self {
        PfBbConfigError::Config(e.to_string())
    }
}
