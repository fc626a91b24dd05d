//! The arm that works the valve and the X/Y/rotary adjustments.
//!
//! The arm has its own controller and SDK; this crate only drives it through
//! the [`Manipulator`] trait. Each method is one discrete arm program and
//! returns once the arm has finished it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a manipulator program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ManipulatorError(pub String);

/// Sign of a one-unit X or Y adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nudge {
    /// `+1`
    Forward,
    /// `-1`
    Back,
}

impl Nudge {
    /// Signed unit.
    pub const fn delta(self) -> i32 {
        match self {
            Nudge::Forward => 1,
            Nudge::Back => -1,
        }
    }

    /// Nudge that brings `current` closer to `target`, if they differ.
    pub fn toward(current: i32, target: i32) -> Option<Self> {
        match current.cmp(&target) {
            std::cmp::Ordering::Less => Some(Nudge::Forward),
            std::cmp::Ordering::Greater => Some(Nudge::Back),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Arm programs used around the stage.
///
/// X and Y adjustments are bracketed: `enter_x`, any number of `step_x`,
/// then `exit_x`. The rotary adjustment works the same way.
#[async_trait]
pub trait Manipulator: Send {
    /// Open the chamber valve.
    async fn open_valve(&mut self) -> Result<(), ManipulatorError>;
    /// Close the chamber valve.
    async fn close_valve(&mut self) -> Result<(), ManipulatorError>;

    /// Move to the X adjustment pose.
    async fn enter_x(&mut self) -> Result<(), ManipulatorError>;
    /// Leave the X adjustment pose.
    async fn exit_x(&mut self) -> Result<(), ManipulatorError>;
    /// Shift X by one unit.
    async fn step_x(&mut self, nudge: Nudge) -> Result<(), ManipulatorError>;

    /// Move to the Y adjustment pose.
    async fn enter_y(&mut self) -> Result<(), ManipulatorError>;
    /// Leave the Y adjustment pose.
    async fn exit_y(&mut self) -> Result<(), ManipulatorError>;
    /// Shift Y by one unit.
    async fn step_y(&mut self, nudge: Nudge) -> Result<(), ManipulatorError>;

    /// Move to the rotary adjustment pose.
    async fn enter_rotary(&mut self) -> Result<(), ManipulatorError>;
    /// Leave the rotary adjustment pose.
    async fn exit_rotary(&mut self) -> Result<(), ManipulatorError>;
    /// Rotate one step toward the upper angle.
    async fn rotate_forward(&mut self) -> Result<(), ManipulatorError>;
    /// Rotate one step toward the lower angle.
    async fn rotate_back(&mut self) -> Result<(), ManipulatorError>;
}

/// One recorded manipulator program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "nudge", rename_all = "snake_case")]
pub enum ManipulatorAction {
    /// [`Manipulator::open_valve`]
    OpenValve,
    /// [`Manipulator::close_valve`]
    CloseValve,
    /// [`Manipulator::enter_x`]
    EnterX,
    /// [`Manipulator::exit_x`]
    ExitX,
    /// [`Manipulator::step_x`]
    StepX(Nudge),
    /// [`Manipulator::enter_y`]
    EnterY,
    /// [`Manipulator::exit_y`]
    ExitY,
    /// [`Manipulator::step_y`]
    StepY(Nudge),
    /// [`Manipulator::enter_rotary`]
    EnterRotary,
    /// [`Manipulator::exit_rotary`]
    ExitRotary,
    /// [`Manipulator::rotate_forward`]
    RotateForward,
    /// [`Manipulator::rotate_back`]
    RotateBack,
}

/// Manipulator that only logs. Used when no arm is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingManipulator;

impl LoggingManipulator {
    fn log(action: ManipulatorAction) -> Result<(), ManipulatorError> {
        tracing::info!(?action, "Manipulator program (not attached)");
        Ok(())
    }
}

#[async_trait]
impl Manipulator for LoggingManipulator {
    async fn open_valve(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::OpenValve)
    }

    async fn close_valve(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::CloseValve)
    }

    async fn enter_x(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::EnterX)
    }

    async fn exit_x(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::ExitX)
    }

    async fn step_x(&mut self, nudge: Nudge) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::StepX(nudge))
    }

    async fn enter_y(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::EnterY)
    }

    async fn exit_y(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::ExitY)
    }

    async fn step_y(&mut self, nudge: Nudge) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::StepY(nudge))
    }

    async fn enter_rotary(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::EnterRotary)
    }

    async fn exit_rotary(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::ExitRotary)
    }

    async fn rotate_forward(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::RotateForward)
    }

    async fn rotate_back(&mut self) -> Result<(), ManipulatorError> {
        Self::log(ManipulatorAction::RotateBack)
    }
}

#[derive(Debug, Default)]
struct Journal {
    actions: Vec<ManipulatorAction>,
    fail_on: Option<ManipulatorAction>,
}

/// Manipulator that records every program. Clones share the journal.
#[derive(Debug, Clone, Default)]
pub struct RecordingManipulator {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingManipulator {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs run so far.
    pub fn actions(&self) -> Vec<ManipulatorAction> {
        self.journal.lock().actions.clone()
    }

    /// Make the next run of `action` fail.
    pub fn fail_on(&self, action: ManipulatorAction) {
        self.journal.lock().fail_on = Some(action);
    }

    fn record(&self, action: ManipulatorAction) -> Result<(), ManipulatorError> {
        let mut journal = self.journal.lock();
        if journal.fail_on == Some(action) {
            journal.fail_on = None;
            return Err(ManipulatorError(format!("{action:?} rejected")));
        }
        journal.actions.push(action);
        Ok(())
    }
}

#[async_trait]
impl Manipulator for RecordingManipulator {
    async fn open_valve(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::OpenValve)
    }

    async fn close_valve(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::CloseValve)
    }

    async fn enter_x(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::EnterX)
    }

    async fn exit_x(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::ExitX)
    }

    async fn step_x(&mut self, nudge: Nudge) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::StepX(nudge))
    }

    async fn enter_y(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::EnterY)
    }

    async fn exit_y(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::ExitY)
    }

    async fn step_y(&mut self, nudge: Nudge) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::StepY(nudge))
    }

    async fn enter_rotary(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::EnterRotary)
    }

    async fn exit_rotary(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::ExitRotary)
    }

    async fn rotate_forward(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::RotateForward)
    }

    async fn rotate_back(&mut self) -> Result<(), ManipulatorError> {
        self.record(ManipulatorAction::RotateBack)
    }
}
