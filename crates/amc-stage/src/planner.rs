//! Turning a transfer request into an ordered list of steps.
//!
//! Planning is pure: it reads the configuration and the last known state
//! and never touches hardware. [`crate::Stage`] executes the result.

use amc_errors::ValidationError;
use serde::{Deserialize, Serialize};

use crate::config::{StageConfig, XyOffset};
use crate::units::same_position;

/// Chamber valve state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveState {
    /// Valve open.
    Open,
    /// Valve closed.
    #[default]
    Closed,
}

impl std::fmt::Display for ValveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValveState::Open => write!(f, "open"),
            ValveState::Closed => write!(f, "closed"),
        }
    }
}

/// Last known position of everything the stage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// Stage position.
    pub position_mm: f64,
    /// Valve.
    pub valve: ValveState,
    /// Manipulator X offset.
    pub x: i32,
    /// Manipulator Y offset.
    pub y: i32,
    /// Rotary angle in degrees.
    pub rotary_deg: i32,
}

impl Default for StageState {
    fn default() -> Self {
        Self {
            position_mm: 0.0,
            valve: ValveState::Closed,
            x: 0,
            y: 0,
            rotary_deg: 5,
        }
    }
}

/// Where to send the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Destination.
    pub target_mm: f64,
    /// X offset at the destination. Defaults to the station preset, then to
    /// the current value.
    #[serde(default)]
    pub x: Option<i32>,
    /// Y offset at the destination, resolved like `x`.
    #[serde(default)]
    pub y: Option<i32>,
    /// Rotary angle at the destination. Only valid for the rotary station.
    #[serde(default)]
    pub rotary_deg: Option<i32>,
}

impl TransferRequest {
    /// Request for `target_mm` with every offset left to the defaults.
    pub fn to(target_mm: f64) -> Self {
        Self {
            target_mm,
            x: None,
            y: None,
            rotary_deg: None,
        }
    }
}

/// One executable step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Open the valve.
    OpenValve,
    /// Close the valve.
    CloseValve,
    /// Relative stage move.
    Move {
        /// Position before the move.
        from_mm: f64,
        /// Position after the move.
        to_mm: f64,
    },
    /// Bring the manipulator to the given X/Y offsets.
    AdjustXy {
        /// Target X.
        x: i32,
        /// Target Y.
        y: i32,
    },
    /// Bring the rotary to the given angle.
    AdjustRotary {
        /// Target angle.
        degrees: i32,
    },
}

/// Plan a transfer from `state` to `request`.
///
/// Order of the plan:
/// 1. open the valve when crossing the valve line downward with it closed;
/// 2. stop at every waypoint strictly between start and target and apply
///    its offsets for the travel direction;
/// 3. move to the target;
/// 4. apply the target offsets;
/// 5. apply the rotary angle at the rotary station;
/// 6. close the valve when crossing the valve line upward with it open.
///
/// # Errors
///
/// Returns an error for a negative or non-finite target, or a rotary angle
/// that cannot be honoured.
pub fn plan(
    config: &StageConfig,
    state: &StageState,
    request: &TransferRequest,
) -> Result<Vec<Step>, ValidationError> {
    let from = state.position_mm;
    let to = request.target_mm;
    if !to.is_finite() || to < 0.0 {
        return Err(ValidationError::invalid_format(
            "target_mm",
            format!("{to} is not a finite, non-negative position"),
        ));
    }

    let mut steps = Vec::new();
    let line = config.valve_line_mm;
    let descending = to < from;

    if from > line && line > to && state.valve == ValveState::Closed {
        steps.push(Step::OpenValve);
    }

    let mut crossed: Vec<_> = config
        .waypoints
        .iter()
        .filter(|w| {
            let p = w.position_mm;
            (from > p && p > to) || (from < p && p < to)
        })
        .collect();
    crossed.sort_by(|a, b| a.position_mm.total_cmp(&b.position_mm));
    if descending {
        crossed.reverse();
    }

    let mut position = from;
    let mut xy = XyOffset::new(state.x, state.y);
    for waypoint in crossed {
        steps.push(Step::Move {
            from_mm: position,
            to_mm: waypoint.position_mm,
        });
        position = waypoint.position_mm;
        xy = if descending {
            waypoint.descending
        } else {
            waypoint.ascending
        };
        steps.push(Step::AdjustXy { x: xy.x, y: xy.y });
    }
    if !same_position(position, to) {
        steps.push(Step::Move {
            from_mm: position,
            to_mm: to,
        });
    }

    let preset = config.preset_at(to);
    let target_xy = XyOffset::new(
        request.x.or(preset.map(|p| p.x)).unwrap_or(xy.x),
        request.y.or(preset.map(|p| p.y)).unwrap_or(xy.y),
    );
    if target_xy != xy {
        steps.push(Step::AdjustXy {
            x: target_xy.x,
            y: target_xy.y,
        });
    }

    if let Some(degrees) = request.rotary_deg {
        if !config.is_rotary_station(to) {
            return Err(ValidationError::constraint(format!(
                "rotary adjustment is only available at {} mm, not {to} mm",
                config.rotary.station_mm
            )));
        }
        config.rotary.check_reachable(state.rotary_deg, degrees)?;
        if degrees != state.rotary_deg {
            steps.push(Step::AdjustRotary { degrees });
        }
    }

    if from < line && line < to && state.valve == ValveState::Open {
        steps.push(Step::CloseValve);
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(position_mm: f64, valve: ValveState) -> StageState {
        StageState {
            position_mm,
            valve,
            ..StageState::default()
        }
    }

    #[test]
    fn test_direct_move_applies_preset() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let steps = plan(&config, &at(536.0, ValveState::Open), &TransferRequest::to(610.0))?;
        assert_eq!(
            steps,
            vec![
                Step::Move {
                    from_mm: 536.0,
                    to_mm: 610.0
                },
                Step::AdjustXy { x: -2, y: 6 },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_descending_through_valve_and_waypoint() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let steps = plan(&config, &at(610.0, ValveState::Closed), &TransferRequest::to(52.0))?;
        assert_eq!(
            steps,
            vec![
                Step::OpenValve,
                Step::Move {
                    from_mm: 610.0,
                    to_mm: 120.0
                },
                Step::AdjustXy { x: -8, y: 10 },
                Step::Move {
                    from_mm: 120.0,
                    to_mm: 52.0
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_ascending_through_waypoint_and_valve() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let steps = plan(&config, &at(52.0, ValveState::Open), &TransferRequest::to(536.0))?;
        assert_eq!(
            steps,
            vec![
                Step::Move {
                    from_mm: 52.0,
                    to_mm: 120.0
                },
                Step::AdjustXy { x: -2, y: 6 },
                Step::Move {
                    from_mm: 120.0,
                    to_mm: 536.0
                },
                Step::CloseValve,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_open_valve_is_not_reopened() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let steps = plan(&config, &at(536.0, ValveState::Open), &TransferRequest::to(300.0))?;
        assert!(!steps.contains(&Step::OpenValve));
        Ok(())
    }

    #[test]
    fn test_explicit_offsets_win_over_preset() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let request = TransferRequest {
            x: Some(4),
            ..TransferRequest::to(610.0)
        };
        let steps = plan(&config, &at(536.0, ValveState::Open), &request)?;
        assert_eq!(steps.last(), Some(&Step::AdjustXy { x: 4, y: 6 }));
        Ok(())
    }

    #[test]
    fn test_rotary_only_at_station() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let request = TransferRequest {
            rotary_deg: Some(135),
            ..TransferRequest::to(536.0)
        };
        let steps = plan(&config, &at(610.0, ValveState::Open), &request)?;
        assert!(steps.contains(&Step::AdjustRotary { degrees: 135 }));

        let elsewhere = TransferRequest {
            rotary_deg: Some(135),
            ..TransferRequest::to(610.0)
        };
        assert!(plan(&config, &at(536.0, ValveState::Open), &elsewhere).is_err());
        Ok(())
    }

    #[test]
    fn test_same_position_plans_no_move() -> Result<(), ValidationError> {
        let config = StageConfig::default();
        let state = StageState {
            x: -2,
            y: 6,
            ..at(460.0, ValveState::Open)
        };
        assert!(plan(&config, &state, &TransferRequest::to(460.0))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_negative_target_rejected() {
        let config = StageConfig::default();
        assert!(plan(&config, &StageState::default(), &TransferRequest::to(-1.0)).is_err());
    }
}
