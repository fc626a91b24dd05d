//! Mapping of the driver's integer return codes.

use std::ffi::c_int;

use amc_errors::DeviceError;

/// Status returned by every successful driver call.
pub const STATUS_OK: c_int = 0;

/// Map the return of `call` to a result.
///
/// # Errors
///
/// Returns [`DeviceError::Status`] for any non-zero code.
pub fn check(call: &'static str, code: c_int) -> Result<(), DeviceError> {
    if code == STATUS_OK {
        Ok(())
    } else {
        Err(DeviceError::status(call, code))
    }
}

/// Map the return of a counting call (`get_device_num`).
///
/// # Errors
///
/// Returns [`DeviceError::Status`] for a negative count.
pub fn check_count(call: &'static str, count: c_int) -> Result<u32, DeviceError> {
    u32::try_from(count).map_err(|_| DeviceError::status(call, count))
}
