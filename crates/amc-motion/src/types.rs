//! Typed values for the driver's integer parameters.
//!
//! The vendor header documents no units or ranges. These types only give
//! names to the raw values; selectors such as [`OutputMode`] and
//! [`SpeedCurve`] are forwarded to the driver untouched.

use core::fmt;
use core::str::FromStr;

use amc_errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Index of an enumerated USB controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIndex(pub i32);

impl DeviceIndex {
    /// The first (and usually only) controller.
    pub const FIRST: Self = Self(0);

    /// Raw value passed to the driver.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for DeviceIndex {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a motion axis on one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisId(pub u32);

impl AxisId {
    /// Raw value passed to the driver.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Axis as the signed integer taken by the encoder calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis does not fit in an `i32`.
    pub fn as_signed(self) -> Result<i32, ValidationError> {
        i32::try_from(self.0)
            .map_err(|_| ValidationError::out_of_range("axis", i64::from(self.0), 0, i64::from(i32::MAX)))
    }
}

impl From<u32> for AxisId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Travel direction.
///
/// `Positive` is the direction in which the position counter grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Raw value `0`.
    Negative,
    /// Raw value `1`.
    Positive,
}

impl Direction {
    /// Raw value passed to the driver.
    pub const fn raw(self) -> u32 {
        match self {
            Direction::Negative => 0,
            Direction::Positive => 1,
        }
    }

    /// Parse the driver encoding.
    ///
    /// # Errors
    ///
    /// Returns an error for anything other than `0` or `1`.
    pub fn from_raw(raw: u32) -> Result<Self, ValidationError> {
        match raw {
            0 => Ok(Direction::Negative),
            1 => Ok(Direction::Positive),
            other => Err(ValidationError::out_of_range("direction", other, 0, 1)),
        }
    }

    /// Direction that takes `from` to `to`. Equal positions count as positive.
    pub fn toward(from: f64, to: f64) -> Self {
        if to >= from {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }

    /// The opposite direction.
    pub const fn reversed(self) -> Self {
        match self {
            Direction::Negative => Direction::Positive,
            Direction::Positive => Direction::Negative,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Negative => write!(f, "negative"),
            Direction::Positive => write!(f, "positive"),
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "-" | "neg" | "negative" => Ok(Direction::Negative),
            "1" | "+" | "pos" | "positive" => Ok(Direction::Positive),
            _ => Err(ValidationError::invalid_format(
                "direction",
                format!("'{s}' is not one of 0, 1, negative, positive"),
            )),
        }
    }
}

/// Pulse output mode selector (`Outmod`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMode(pub u8);

impl OutputMode {
    /// Mode `0`, used by every known caller.
    pub const DEFAULT: Self = Self(0);
}

/// Speed curve selector for profiled moves (`curve`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedCurve(pub u32);

impl SpeedCurve {
    /// Curve `0`, used by every known caller.
    pub const DEFAULT: Self = Self(0);
}

/// One byte-wide digital port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortBits(pub u8);

impl PortBits {
    /// All lines low.
    pub const NONE: Self = Self(0);
    /// All lines high.
    pub const ALL: Self = Self(0xFF);

    /// Mask with only `line` set.
    ///
    /// # Errors
    ///
    /// Returns an error if `line` is not in `0..8`.
    pub fn line(line: u8) -> Result<Self, ValidationError> {
        if line >= 8 {
            return Err(ValidationError::out_of_range("line", line, 0, 7));
        }
        Ok(Self(1 << line))
    }

    /// Whether `line` is high. Lines outside `0..8` read as low.
    pub fn is_set(self, line: u8) -> bool {
        line < 8 && self.0 & (1 << line) != 0
    }

    /// Copy with the bits of `mask` raised.
    #[must_use]
    pub const fn with(self, mask: PortBits) -> Self {
        Self(self.0 | mask.0)
    }

    /// Copy with the bits of `mask` lowered.
    #[must_use]
    pub const fn without(self, mask: PortBits) -> Self {
        Self(self.0 & !mask.0)
    }

    /// Raw value passed to the driver.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PortBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}

impl FromStr for PortBits {
    type Err = ValidationError;

    /// Accepts `0b…`, `0x…` or decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if let Some(bin) = s.strip_prefix("0b") {
            u8::from_str_radix(bin, 2)
        } else if let Some(hex) = s.strip_prefix("0x") {
            u8::from_str_radix(hex, 16)
        } else {
            s.parse::<u8>()
        };
        parsed
            .map(PortBits)
            .map_err(|e| ValidationError::invalid_format("port", format!("'{s}': {e}")))
    }
}

/// Motion state reported by `Read_Position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "lowercase")]
pub enum RunState {
    /// Raw `0`: the axis is idle, any commanded move has finished.
    Stopped,
    /// Any non-zero raw value.
    Running(u8),
}

impl RunState {
    /// Decode the raw byte.
    pub const fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            RunState::Stopped
        } else {
            RunState::Running(raw)
        }
    }

    /// Raw byte as reported by the driver.
    pub const fn raw(self) -> u8 {
        match self {
            RunState::Stopped => 0,
            RunState::Running(code) => code,
        }
    }

    /// Whether the axis is moving.
    pub const fn is_running(self) -> bool {
        matches!(self, RunState::Running(_))
    }
}

/// Snapshot returned by `Read_Position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisStatus {
    /// Position counter in pulses.
    pub position: u32,
    /// Motion state.
    pub run_state: RunState,
    /// Axis IO lines (limit/origin inputs).
    pub io_state: u8,
    /// Synchronous IO byte.
    pub sync_io: u8,
}

impl AxisStatus {
    /// Whether the axis is moving.
    pub const fn is_moving(&self) -> bool {
        self.run_state.is_running()
    }
}

/// Encoder input configuration (`Set_Encorder`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Counting mode selector, forwarded as is.
    pub mode: i32,
    /// Preset the counter to `0x8000` (`set8000`).
    pub preset_8000: bool,
    /// Enable counting.
    pub enabled: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: 0,
            preset_8000: false,
            enabled: true,
        }
    }
}
