//! Error type of the stage layer.

use std::path::PathBuf;

use amc_errors::{AmcError, ValidationError};
use thiserror::Error;

/// Errors raised while planning or executing a transfer.
#[derive(Debug, Error)]
pub enum StageError {
    /// Motion controller failure
    #[error(transparent)]
    Motion(#[from] AmcError),

    /// Invalid request or configuration value
    #[error("Invalid stage request: {0}")]
    Validation(#[from] ValidationError),

    /// The manipulator reported a failure
    #[error("Manipulator failed during {action}: {reason}")]
    Manipulator {
        /// Action that failed
        action: &'static str,
        /// Reported reason
        reason: String,
    },

    /// A stop request aborted the transfer
    #[error("Transfer stopped at {position_mm} mm")]
    Stopped {
        /// Stage position when the axis came to rest
        position_mm: f64,
    },

    /// The configuration file could not be used
    #[error("Config {path}: {reason}")]
    Config {
        /// File involved
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The worker task has exited
    #[error("Stage worker is not running")]
    WorkerGone,
}

impl StageError {
    /// Create a configuration error.
    pub fn config(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        StageError::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for this crate.
pub type StageResult<T> = Result<T, StageError>;
