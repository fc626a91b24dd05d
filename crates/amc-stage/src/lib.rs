//! Linear-stage transfers on top of the AMC1XE motion controller.
//!
//! A lab stage carries samples between stations along one motorised axis.
//! Moving between stations is more than a relative move: the chamber valve
//! must be open before the stage passes below the valve line and is closed
//! again on the way up, and an arm realigns the sample holder at waypoints
//! and at the destination.
//!
//! - [`planner`] turns a request into ordered [`Step`]s;
//! - [`Stage`] executes them, polling the axis until it stops;
//! - [`worker`] runs a stage in a tokio task fed by [`StageCommand`]s and
//!   publishing [`StageEvent`]s.

#![deny(static_mut_refs)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod manipulator;
pub mod planner;
pub mod stage;
pub mod units;
pub mod worker;

pub use config::{RotaryConfig, SCHEMA_VERSION, StageConfig, StationPreset, Waypoint, XyOffset};
pub use error::{StageError, StageResult};
pub use manipulator::{
    LoggingManipulator, Manipulator, ManipulatorAction, ManipulatorError, Nudge,
    RecordingManipulator,
};
pub use planner::{StageState, Step, TransferRequest, ValveState, plan};
pub use stage::{Stage, StageEvent, StopSignal};
pub use units::{DEFAULT_PULSES_PER_MM, mm_to_pulses, pulses_to_mm};
pub use worker::{StageCommand, StageHandle, spawn};
