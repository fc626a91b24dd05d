//! Millimetre to pulse conversion.

use amc_errors::ValidationError;

/// Pulses per millimetre of the stage lead screw.
pub const DEFAULT_PULSES_PER_MM: u32 = 12_500;

/// Tolerance used when comparing stage positions in millimetres.
pub const POSITION_EPSILON_MM: f64 = 1e-6;

/// Whether two stage positions denote the same point.
pub fn same_position(a: f64, b: f64) -> bool {
    (a - b).abs() < POSITION_EPSILON_MM
}

/// Convert a travel distance to pulses, rounding toward zero.
///
/// # Errors
///
/// Returns an error for a negative or non-finite distance, or one that does
/// not fit the driver's 32-bit length.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is finite, non-negative and range checked before the cast"
)]
pub fn mm_to_pulses(distance_mm: f64, pulses_per_mm: u32) -> Result<u32, ValidationError> {
    if !distance_mm.is_finite() || distance_mm < 0.0 {
        return Err(ValidationError::invalid_format(
            "distance_mm",
            format!("{distance_mm} is not a finite, non-negative distance"),
        ));
    }
    let pulses = (distance_mm * f64::from(pulses_per_mm)).trunc();
    if pulses > f64::from(u32::MAX) {
        return Err(ValidationError::out_of_range(
            "distance_mm",
            distance_mm,
            0.0,
            f64::from(u32::MAX) / f64::from(pulses_per_mm.max(1)),
        ));
    }
    Ok(pulses as u32)
}

/// Convert pulses back to millimetres.
pub fn pulses_to_mm(pulses: u32, pulses_per_mm: u32) -> f64 {
    f64::from(pulses) / f64::from(pulses_per_mm.max(1))
}
