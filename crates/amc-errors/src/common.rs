//! The top-level error and how it is classified for operators.

use core::fmt;

use crate::{DeviceError, ValidationError};

/// Any failure of a toolkit operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmcError {
    /// Driver and hardware errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Parameters refused before they reached the driver
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl AmcError {
    /// What kind of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AmcError::Device(e) => e.category(),
            AmcError::Validation(_) => ErrorCategory::InvalidInput,
        }
    }

    /// How serious the failure is.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AmcError::Device(e) => e.severity(),
            AmcError::Validation(e) => e.severity(),
        }
    }

    /// Whether running the same command again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AmcError::Device(e) if e.is_retryable())
    }
}

/// Kind of failure, as reported to whoever runs the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The library, the controller or the addressed device cannot be reached.
    Unavailable,
    /// The driver answered with a non-zero status.
    Rejected,
    /// Motion did not run to completion.
    Interrupted,
    /// The request was refused before reaching the driver.
    InvalidInput,
}

impl ErrorCategory {
    /// Stable lowercase name used in machine-readable output.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Rejected => "rejected",
            ErrorCategory::Interrupted => "interrupted",
            ErrorCategory::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info,
    /// Warning, may require attention
    Warning,
    /// Error, operation failed
    Error,
    /// Critical, the controller cannot be used
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(ErrorCategory::Unavailable.to_string(), "unavailable");
        assert_eq!(ErrorCategory::InvalidInput.as_str(), "invalid_input");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_validation_is_invalid_input() {
        let err: AmcError = ValidationError::required("axis").into();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_device_classification_passes_through() {
        let err: AmcError = DeviceError::timeout("stage move", 5).into();
        assert_eq!(err.category(), ErrorCategory::Interrupted);
        assert!(err.is_retryable());

        let err: AmcError = DeviceError::library_unavailable("no dll").into();
        assert_eq!(err.category(), ErrorCategory::Unavailable);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
