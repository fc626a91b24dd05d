//! Snapshot tests for error message formatting.
//!
//! Operators read these messages in the CLI, so their wording is pinned.

use amc_errors::{AmcError, DeviceError, ValidationError};
use insta::assert_snapshot;

#[test]
fn test_status_message() {
    assert_snapshot!(
        DeviceError::status("DeltMov", 3).to_string(),
        @"Driver call DeltMov failed with status 3"
    );
}

#[test]
fn test_not_found_message() {
    assert_snapshot!(
        DeviceError::NotFound { device: 2, available: 1 }.to_string(),
        @"Device 2 not found (1 device(s) enumerated)"
    );
}

#[test]
fn test_invalid_axis_message() {
    assert_snapshot!(
        DeviceError::InvalidAxis { device: 0, axis: 9 }.to_string(),
        @"Axis 9 does not exist on device 0"
    );
}

#[test]
fn test_timeout_message() {
    assert_snapshot!(
        DeviceError::timeout("Stage move", 120000).to_string(),
        @"Stage move timed out after 120000ms"
    );
}

#[test]
fn test_stopped_message() {
    assert_snapshot!(
        DeviceError::Stopped { device: 0, axis: 0 }.to_string(),
        @"Motion on device 0 axis 0 was stopped"
    );
}

#[test]
fn test_wrapped_validation_message() {
    let err: AmcError = ValidationError::out_of_range("pulses_per_mm", 0.0, 1.0, 1000000.0).into();
    assert_snapshot!(
        err.to_string(),
        @"Validation error: pulses_per_mm value 0 is out of range [1, 1000000]"
    );
}
