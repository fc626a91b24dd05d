//! Error types and exit codes for amcctl

use amc_errors::{AmcError, ErrorCategory, ValidationError};
use amc_stage::StageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Transfer stopped at {0:.3} mm")]
    TransferStopped(f64),
}

/// The toolkit error behind a failed command, if there is one.
pub fn toolkit_error(error: &anyhow::Error) -> Option<AmcError> {
    if let Some(e) = error.downcast_ref::<AmcError>() {
        return Some(e.clone());
    }
    if let Some(e) = error.downcast_ref::<ValidationError>() {
        return Some(e.clone().into());
    }
    match error.downcast_ref::<StageError>()? {
        StageError::Motion(e) => Some(e.clone()),
        StageError::Validation(e) => Some(e.clone().into()),
        _ => None,
    }
}

/// Exit code for a failed command.
///
/// `2` device or library missing, `4` invalid input, `5` the driver
/// rejected a call, `1` anything else.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<CliError>() {
        return match e {
            CliError::DeviceNotFound(_) => 2,
            CliError::TransferStopped(_) => 1,
        };
    }
    if let Some(e) = toolkit_error(error) {
        return category_code(e.category());
    }
    if matches!(
        error.downcast_ref::<StageError>(),
        Some(StageError::Config { .. })
    ) || error.downcast_ref::<serde_json::Error>().is_some()
    {
        return 4;
    }
    1
}

fn category_code(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Unavailable => 2,
        ErrorCategory::InvalidInput => 4,
        ErrorCategory::Rejected => 5,
        ErrorCategory::Interrupted => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_errors::DeviceError;

    #[test]
    fn test_exit_codes() {
        let cases: Vec<(anyhow::Error, i32)> = vec![
            (CliError::DeviceNotFound("3".into()).into(), 2),
            (AmcError::from(DeviceError::library_unavailable("nope")).into(), 2),
            (AmcError::from(DeviceError::NotOpen).into(), 2),
            (AmcError::from(DeviceError::status("DeltMov", 3)).into(), 5),
            (AmcError::from(DeviceError::InvalidAxis { device: 0, axis: 9 }).into(), 4),
            (AmcError::from(ValidationError::required("speed")).into(), 4),
            (StageError::from(ValidationError::required("target_mm")).into(), 4),
            (StageError::config("stage.json", "failed to parse").into(), 4),
            (
                StageError::from(AmcError::from(DeviceError::status("Set_Axs", 1))).into(),
                5,
            ),
            (
                StageError::from(AmcError::from(DeviceError::timeout("stage move", 10))).into(),
                1,
            ),
            (ValidationError::required("from").into(), 4),
            (StageError::WorkerGone.into(), 1),
            (anyhow::anyhow!("something else"), 1),
        ];
        for (error, expected) in cases {
            assert_eq!(exit_code(&error), expected, "{error}");
        }
    }

    #[test]
    fn test_exit_code_survives_context() {
        let error = anyhow::Error::from(AmcError::from(DeviceError::NotFound {
            device: 1,
            available: 1,
        }))
        .context("device reset");
        assert_eq!(exit_code(&error), 2);
    }

    #[test]
    fn test_toolkit_error_unwraps_stage_errors() {
        let error = anyhow::Error::from(StageError::from(AmcError::from(DeviceError::timeout(
            "stage move",
            10,
        ))));
        let inner = toolkit_error(&error);
        assert_eq!(
            inner.map(|e| e.category()),
            Some(ErrorCategory::Interrupted)
        );
        assert!(toolkit_error(&anyhow::Error::from(StageError::WorkerGone)).is_none());
    }
}
