//! Parameter sets for the motion commands.
//!
//! Speeds and times are raw driver units. The only rules enforced here are
//! the ones every caller relies on: a non-zero target speed, a start speed
//! that does not exceed it, and a non-zero length for relative moves.

use amc_errors::ValidationError;
use serde::{Deserialize, Serialize};

use crate::types::{Direction, OutputMode, SpeedCurve};

fn check_speeds(start_speed: u32, target_speed: u32) -> Result<(), ValidationError> {
    if target_speed == 0 {
        return Err(ValidationError::out_of_range(
            "target_speed",
            target_speed,
            1,
            u32::MAX,
        ));
    }
    if start_speed > target_speed {
        return Err(ValidationError::constraint(format!(
            "start speed {start_speed} exceeds target speed {target_speed}"
        )));
    }
    Ok(())
}

/// Return-to-origin command (`MovToOrg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomingParams {
    /// Direction to search for the origin switch.
    pub direction: Direction,
    /// Pulse output mode.
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Search speed.
    pub speed: u32,
}

impl HomingParams {
    /// Homing in `direction` at `speed` with the default output mode.
    pub fn new(direction: Direction, speed: u32) -> Self {
        Self {
            direction,
            output_mode: OutputMode::DEFAULT,
            speed,
        }
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the speed is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.speed == 0 {
            return Err(ValidationError::out_of_range("speed", 0, 1, u32::MAX));
        }
        Ok(())
    }
}

/// Frequency band of a continuous move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JogBand {
    /// `FL_ContinueMov`
    Low,
    /// `FH_ContinueMov`
    High,
}

impl JogBand {
    /// C name of the driver call for this band.
    pub const fn call(self) -> &'static str {
        match self {
            JogBand::Low => "FL_ContinueMov",
            JogBand::High => "FH_ContinueMov",
        }
    }
}

/// Continuous move until stopped (`FL_ContinueMov` / `FH_ContinueMov`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JogParams {
    /// Travel direction.
    pub direction: Direction,
    /// Pulse output mode.
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Start speed (Vo).
    pub start_speed: u32,
    /// Target speed (Vt).
    pub target_speed: u32,
}

impl JogParams {
    /// Jog in `direction` ramping from `start_speed` to `target_speed`.
    pub fn new(direction: Direction, start_speed: u32, target_speed: u32) -> Self {
        Self {
            direction,
            output_mode: OutputMode::DEFAULT,
            start_speed,
            target_speed,
        }
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the target speed is zero or below the start speed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_speeds(self.start_speed, self.target_speed)
    }
}

/// Speed change of a running high-frequency jog (`FH_ContinueAdjustSpeed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedAdjustment {
    /// Start speed (Vo).
    pub start_speed: u32,
    /// New target speed (Vt).
    pub target_speed: u32,
}

impl SpeedAdjustment {
    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the target speed is zero or below the start speed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_speeds(self.start_speed, self.target_speed)
    }
}

/// Profiled relative move (`DeltMov`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeMove {
    /// Speed curve selector.
    pub curve: SpeedCurve,
    /// Travel direction.
    pub direction: Direction,
    /// Pulse output mode.
    pub output_mode: OutputMode,
    /// Start speed (Vo).
    pub start_speed: u32,
    /// Target speed (Vt).
    pub target_speed: u32,
    /// Distance in pulses.
    pub length: u32,
    /// Deceleration start point (`StartDec`), `0` lets the driver decide.
    pub start_dec: u32,
    /// Acceleration time.
    pub acc_time: u32,
    /// Deceleration time.
    pub dec_time: u32,
}

impl RelativeMove {
    /// Start building a move of `length` pulses in `direction`.
    pub fn builder(direction: Direction, length: u32) -> RelativeMoveBuilder {
        RelativeMoveBuilder {
            inner: RelativeMove {
                curve: SpeedCurve::DEFAULT,
                direction,
                output_mode: OutputMode::DEFAULT,
                start_speed: MotionProfile::default().start_speed,
                target_speed: MotionProfile::default().target_speed,
                length,
                start_dec: 0,
                acc_time: MotionProfile::default().acc_time,
                dec_time: MotionProfile::default().dec_time,
            },
        }
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is zero or the speeds are inconsistent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.length == 0 {
            return Err(ValidationError::out_of_range("length", 0, 1, u32::MAX));
        }
        check_speeds(self.start_speed, self.target_speed)
    }
}

/// Builder for [`RelativeMove`].
#[derive(Debug, Clone, Copy)]
pub struct RelativeMoveBuilder {
    inner: RelativeMove,
}

impl RelativeMoveBuilder {
    /// Apply every field of a stored profile.
    #[must_use]
    pub fn profile(mut self, profile: &MotionProfile) -> Self {
        self.inner.curve = profile.curve;
        self.inner.output_mode = profile.output_mode;
        self.inner.start_speed = profile.start_speed;
        self.inner.target_speed = profile.target_speed;
        self.inner.start_dec = profile.start_dec;
        self.inner.acc_time = profile.acc_time;
        self.inner.dec_time = profile.dec_time;
        self
    }

    /// Set the speed curve selector.
    #[must_use]
    pub fn curve(mut self, curve: SpeedCurve) -> Self {
        self.inner.curve = curve;
        self
    }

    /// Set the pulse output mode.
    #[must_use]
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.inner.output_mode = mode;
        self
    }

    /// Set start and target speed.
    #[must_use]
    pub fn speeds(mut self, start_speed: u32, target_speed: u32) -> Self {
        self.inner.start_speed = start_speed;
        self.inner.target_speed = target_speed;
        self
    }

    /// Set the deceleration start point.
    #[must_use]
    pub fn start_dec(mut self, start_dec: u32) -> Self {
        self.inner.start_dec = start_dec;
        self
    }

    /// Set acceleration and deceleration times.
    #[must_use]
    pub fn ramp(mut self, acc_time: u32, dec_time: u32) -> Self {
        self.inner.acc_time = acc_time;
        self.inner.dec_time = dec_time;
        self
    }

    /// Validate and return the move.
    ///
    /// # Errors
    ///
    /// See [`RelativeMove::validate`].
    pub fn build(self) -> Result<RelativeMove, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Stored speed profile for relative moves.
///
/// Defaults are the values the stage has been run with: Vo 1000, Vt 40000,
/// 100/100 ramps, curve and output mode `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionProfile {
    /// Speed curve selector.
    pub curve: SpeedCurve,
    /// Pulse output mode.
    pub output_mode: OutputMode,
    /// Start speed (Vo).
    pub start_speed: u32,
    /// Target speed (Vt).
    pub target_speed: u32,
    /// Deceleration start point.
    pub start_dec: u32,
    /// Acceleration time.
    pub acc_time: u32,
    /// Deceleration time.
    pub dec_time: u32,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            curve: SpeedCurve::DEFAULT,
            output_mode: OutputMode::DEFAULT,
            start_speed: 1000,
            target_speed: 40000,
            start_dec: 0,
            acc_time: 100,
            dec_time: 100,
        }
    }
}

impl MotionProfile {
    /// Check the speeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the target speed is zero or below the start speed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_speeds(self.start_speed, self.target_speed)
    }
}
