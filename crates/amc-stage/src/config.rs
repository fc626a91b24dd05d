//! Stage configuration file.
//!
//! JSON, loaded with defaults created on first use. Positions are in
//! millimetres along the stage, manipulator offsets in its own step units and
//! rotary angles in degrees.

use std::path::Path;
use std::time::Duration;

use amc_errors::ValidationError;
use amc_motion::{AxisId, Backend, DeviceIndex, MotionProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StageError, StageResult};
use crate::units::{DEFAULT_PULSES_PER_MM, same_position};

/// Schema identifier written to every file.
pub const SCHEMA_VERSION: &str = "amc.stage/1";

/// Manipulator X/Y offset pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XyOffset {
    /// X offset.
    pub x: i32,
    /// Y offset.
    pub y: i32,
}

impl XyOffset {
    /// Offset `(x, y)`.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Intermediate stop where the manipulator realigns before the stage continues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Stage position.
    pub position_mm: f64,
    /// Offsets applied when passing the waypoint toward lower positions.
    pub descending: XyOffset,
    /// Offsets applied when passing the waypoint toward higher positions.
    pub ascending: XyOffset,
}

/// Offsets the manipulator takes at a named station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationPreset {
    /// Stage position of the station.
    pub position_mm: f64,
    /// Manipulator offsets at the station.
    pub offset: XyOffset,
}

/// The station where the rotary adjustment is available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotaryConfig {
    /// Stage position of the rotary station.
    pub station_mm: f64,
    /// Lowest angle.
    pub min_deg: i32,
    /// Highest angle.
    pub max_deg: i32,
    /// Angle covered by one rotation step.
    pub step_deg: i32,
}

impl Default for RotaryConfig {
    fn default() -> Self {
        Self {
            station_mm: 536.0,
            min_deg: 5,
            max_deg: 135,
            step_deg: 130,
        }
    }
}

impl RotaryConfig {
    /// Check that `target` is reachable from `current` in whole steps.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is outside the range or off the step grid.
    pub fn check_reachable(&self, current: i32, target: i32) -> Result<(), ValidationError> {
        if target < self.min_deg || target > self.max_deg {
            return Err(ValidationError::out_of_range(
                "rotary",
                target,
                self.min_deg,
                self.max_deg,
            ));
        }
        if (target - current) % self.step_deg != 0 {
            return Err(ValidationError::constraint(format!(
                "rotary angle {target} is not reachable from {current} in {} degree steps",
                self.step_deg
            )));
        }
        Ok(())
    }
}

/// Complete stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Schema identifier, see [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Driver selection.
    pub backend: Backend,
    /// Controller index.
    pub device: DeviceIndex,
    /// Axis driving the stage.
    pub axis: AxisId,
    /// Lead screw resolution.
    pub pulses_per_mm: u32,
    /// Speed profile of stage moves.
    pub profile: MotionProfile,
    /// Interval between position polls.
    pub poll_interval_ms: u64,
    /// Slack added to the estimated travel time of a move before it is
    /// stopped as timed out.
    pub move_timeout_ms: u64,
    /// Crossing this position downward needs the valve open, crossing it
    /// upward closes the valve.
    pub valve_line_mm: f64,
    /// Realignment stops.
    pub waypoints: Vec<Waypoint>,
    /// Rotary station.
    pub rotary: RotaryConfig,
    /// Manipulator offsets per station.
    pub presets: Vec<StationPreset>,
}

impl Default for StageConfig {
    fn default() -> Self {
        let rear = XyOffset::new(-2, 6);
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            backend: Backend::default(),
            device: DeviceIndex::FIRST,
            axis: AxisId(0),
            pulses_per_mm: DEFAULT_PULSES_PER_MM,
            profile: MotionProfile::default(),
            poll_interval_ms: 100,
            move_timeout_ms: 30_000,
            valve_line_mm: 460.0,
            waypoints: vec![Waypoint {
                position_mm: 120.0,
                descending: XyOffset::new(-8, 10),
                ascending: rear,
            }],
            rotary: RotaryConfig::default(),
            presets: vec![
                StationPreset {
                    position_mm: 52.0,
                    offset: XyOffset::new(-8, 10),
                },
                StationPreset {
                    position_mm: 120.0,
                    offset: rear,
                },
                StationPreset {
                    position_mm: 460.0,
                    offset: rear,
                },
                StationPreset {
                    position_mm: 536.0,
                    offset: rear,
                },
                StationPreset {
                    position_mm: 610.0,
                    offset: rear,
                },
                StationPreset {
                    position_mm: 5362.0,
                    offset: rear,
                },
            ],
        }
    }
}

impl StageConfig {
    /// Load from `path`, writing the defaults there first if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Config`] if the file cannot be read, parsed or
    /// created.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| StageError::config(path, e))?
        {
            info!(path = %path.display(), "Config file not found, creating default");
            let config = Self::default();
            config.save_to_path(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StageError::config(path, format!("failed to read: {e}")))?;
        let config: StageConfig = serde_json::from_str(&content)
            .map_err(|e| StageError::config(path, format!("failed to parse: {e}")))?;

        debug!(path = %path.display(), "Loaded stage config");
        Ok(config)
    }

    /// Write to `path` as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Config`] on any IO or serialization failure.
    pub async fn save_to_path<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::config(path, format!("failed to create directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StageError::config(path, format!("failed to serialize: {e}")))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| StageError::config(path, format!("failed to write: {e}")))?;

        debug!(path = %path.display(), "Saved stage config");
        Ok(())
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::invalid_format(
                "schema_version",
                format!("expected {SCHEMA_VERSION}, found {}", self.schema_version),
            ));
        }
        if self.pulses_per_mm == 0 {
            return Err(ValidationError::out_of_range("pulses_per_mm", 0, 1, u32::MAX));
        }
        self.profile.validate()?;
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 10_000 {
            return Err(ValidationError::out_of_range(
                "poll_interval_ms",
                self.poll_interval_ms,
                1,
                10_000,
            ));
        }
        if self.move_timeout_ms < self.poll_interval_ms {
            return Err(ValidationError::constraint(format!(
                "move timeout {}ms is shorter than the poll interval {}ms",
                self.move_timeout_ms, self.poll_interval_ms
            )));
        }
        let positions = self
            .waypoints
            .iter()
            .map(|w| w.position_mm)
            .chain(self.presets.iter().map(|p| p.position_mm))
            .chain([self.valve_line_mm, self.rotary.station_mm]);
        for position in positions {
            if !position.is_finite() || position < 0.0 {
                return Err(ValidationError::invalid_format(
                    "position_mm",
                    format!("{position} is not a finite, non-negative position"),
                ));
            }
        }
        if self.rotary.step_deg <= 0 || self.rotary.min_deg > self.rotary.max_deg {
            return Err(ValidationError::constraint(format!(
                "rotary range {}..={} with step {} is empty",
                self.rotary.min_deg, self.rotary.max_deg, self.rotary.step_deg
            )));
        }
        Ok(())
    }

    /// Preset offsets of the station at `position_mm`, if one is configured.
    pub fn preset_at(&self, position_mm: f64) -> Option<XyOffset> {
        self.presets
            .iter()
            .find(|p| same_position(p.position_mm, position_mm))
            .map(|p| p.offset)
    }

    /// Whether `position_mm` is the rotary station.
    pub fn is_rotary_station(&self, position_mm: f64) -> bool {
        same_position(self.rotary.station_mm, position_mm)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Time a move of `pulses` may take before it is stopped.
    ///
    /// The estimate treats the target speed as pulses per second and the
    /// ramp times as milliseconds, then adds [`StageConfig::move_timeout_ms`].
    pub fn move_deadline(&self, pulses: u32) -> Duration {
        let cruise = f64::from(pulses) / f64::from(self.profile.target_speed.max(1));
        let ramps = self
            .profile
            .acc_time
            .saturating_add(self.profile.dec_time);
        Duration::from_secs_f64(cruise)
            .saturating_add(Duration::from_millis(u64::from(ramps)))
            .saturating_add(Duration::from_millis(self.move_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() -> Result<(), ValidationError> {
        StageConfig::default().validate()
    }

    #[test]
    fn test_default_presets() {
        let config = StageConfig::default();
        assert_eq!(config.preset_at(52.0), Some(XyOffset::new(-8, 10)));
        assert_eq!(config.preset_at(5362.0), Some(XyOffset::new(-2, 6)));
        assert_eq!(config.preset_at(300.0), None);
        assert!(config.is_rotary_station(536.0));
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let config = StageConfig {
            pulses_per_mm: 0,
            ..StageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_timeout_below_poll() {
        let config = StageConfig {
            poll_interval_ms: 500,
            move_timeout_ms: 100,
            ..StageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_schema() {
        let config = StageConfig {
            schema_version: "amc.stage/0".to_string(),
            ..StageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_move_deadline_covers_travel_time() {
        let config = StageConfig::default();
        // 120 -> 610 mm at 40000 pulses/s is about 153 s of travel.
        let pulses = 490 * DEFAULT_PULSES_PER_MM;
        let deadline = config.move_deadline(pulses);
        assert!(deadline > Duration::from_secs(153));
        assert!(deadline < Duration::from_secs(190));

        let longest = config.move_deadline(5362 * DEFAULT_PULSES_PER_MM);
        assert!(longest > Duration::from_secs(1675));
    }

    #[test]
    fn test_move_deadline_is_at_least_the_margin() {
        let config = StageConfig {
            move_timeout_ms: 250,
            ..StageConfig::default()
        };
        assert!(config.move_deadline(0) >= Duration::from_millis(250));
    }

    #[test]
    fn test_rotary_reachability() {
        let rotary = RotaryConfig::default();
        assert!(rotary.check_reachable(5, 135).is_ok());
        assert!(rotary.check_reachable(135, 5).is_ok());
        assert!(rotary.check_reachable(5, 5).is_ok());
        assert!(rotary.check_reachable(5, 90).is_err());
        assert!(rotary.check_reachable(5, 265).is_err());
    }
}
