//! Driver and hardware-related error types.

use crate::common::{ErrorCategory, ErrorSeverity};

/// Driver and hardware errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The vendor library could not be loaded
    #[error("Motion library unavailable: {0}")]
    LibraryUnavailable(String),

    /// A device call was made before `openUSB` succeeded
    #[error("USB controller is not open")]
    NotOpen,

    /// Device index outside the enumerated range
    #[error("Device {device} not found ({available} device(s) enumerated)")]
    NotFound {
        /// Requested device index
        device: i32,
        /// Number of devices reported by the driver
        available: i32,
    },

    /// Axis index not present on the device
    #[error("Axis {axis} does not exist on device {device}")]
    InvalidAxis {
        /// Device index
        device: i32,
        /// Requested axis
        axis: u32,
    },

    /// The driver returned a non-zero status code
    #[error("Driver call {call} failed with status {code}")]
    Status {
        /// C name of the failing call
        call: &'static str,
        /// Raw status code
        code: i32,
    },

    /// The axis is executing another command
    #[error("Axis {axis} on device {device} is busy")]
    Busy {
        /// Device index
        device: i32,
        /// Axis index
        axis: u32,
    },

    /// An operation did not finish in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Motion was aborted by a stop request
    #[error("Motion on device {device} axis {axis} was stopped")]
    Stopped {
        /// Device index
        device: i32,
        /// Axis index
        axis: u32,
    },
}

impl DeviceError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeviceError::LibraryUnavailable(_) => ErrorSeverity::Critical,
            DeviceError::NotOpen => ErrorSeverity::Error,
            DeviceError::NotFound { .. } => ErrorSeverity::Error,
            DeviceError::InvalidAxis { .. } => ErrorSeverity::Error,
            DeviceError::Status { .. } => ErrorSeverity::Error,
            DeviceError::Busy { .. } => ErrorSeverity::Warning,
            DeviceError::Timeout { .. } => ErrorSeverity::Warning,
            DeviceError::Stopped { .. } => ErrorSeverity::Info,
        }
    }

    /// Classify the failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeviceError::LibraryUnavailable(_)
            | DeviceError::NotOpen
            | DeviceError::NotFound { .. } => ErrorCategory::Unavailable,
            DeviceError::InvalidAxis { .. } => ErrorCategory::InvalidInput,
            DeviceError::Status { .. } => ErrorCategory::Rejected,
            DeviceError::Busy { .. } | DeviceError::Timeout { .. } | DeviceError::Stopped { .. } => {
                ErrorCategory::Interrupted
            }
        }
    }

    /// Check if retrying the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Timeout { .. } | DeviceError::Busy { .. })
    }

    /// Create a status error for a driver call.
    pub fn status(call: &'static str, code: i32) -> Self {
        DeviceError::Status { call, code }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        DeviceError::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a library unavailable error.
    pub fn library_unavailable(reason: impl Into<String>) -> Self {
        DeviceError::LibraryUnavailable(reason.into())
    }
}
