//! Command implementations for amcctl

pub mod axis;
pub mod device;
pub mod encoder;
pub mod motion;
pub mod port;
pub mod stage;

use std::path::PathBuf;

use amc_motion::{AxisId, DeviceIndex, Direction, DynController, OutputMode, PortBits};
use amc_stage::{StageState, TransferRequest, ValveState};
use anyhow::Result;
use clap::{Args, Subcommand};

use crate::error::CliError;

/// Device and axis selection shared by the per-axis commands.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTarget {
    /// Controller index
    #[arg(short, long, default_value_t = 0)]
    pub device: i32,
    /// Axis index
    #[arg(short, long, default_value_t = 0)]
    pub axis: u32,
}

impl AxisTarget {
    pub fn device_index(&self) -> DeviceIndex {
        DeviceIndex(self.device)
    }

    pub fn axis_id(&self) -> AxisId {
        AxisId(self.axis)
    }
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    /// List connected controllers
    List,

    /// Reset a controller's USB connection
    Reset {
        /// Controller index
        device: i32,
    },
}

#[derive(Subcommand, Debug)]
pub enum PortCommands {
    /// Read the input port
    ReadIn {
        /// Controller index
        #[arg(short, long, default_value_t = 0)]
        device: i32,
    },

    /// Read back the output port
    ReadOut {
        /// Controller index
        #[arg(short, long, default_value_t = 0)]
        device: i32,
    },

    /// Replace the output port (0b…, 0x… or decimal)
    Write {
        bits: PortBits,
        /// Controller index
        #[arg(short, long, default_value_t = 0)]
        device: i32,
    },

    /// Raise the given output lines
    Set {
        bits: PortBits,
        /// Controller index
        #[arg(short, long, default_value_t = 0)]
        device: i32,
    },

    /// Lower the given output lines
    Clear {
        bits: PortBits,
        /// Controller index
        #[arg(short, long, default_value_t = 0)]
        device: i32,
    },
}

#[derive(Subcommand, Debug)]
pub enum AxisCommands {
    /// Enable the axis drive
    Enable {
        #[command(flatten)]
        target: AxisTarget,
    },

    /// Disable the axis drive
    Disable {
        #[command(flatten)]
        target: AxisTarget,
    },

    /// Stop any motion on the axis
    Stop {
        #[command(flatten)]
        target: AxisTarget,
    },

    /// Show position, run state and IO lines
    Status {
        #[command(flatten)]
        target: AxisTarget,
    },

    /// Show the current output speed
    Speed {
        #[command(flatten)]
        target: AxisTarget,
    },
}

#[derive(Args, Debug)]
pub struct HomeArgs {
    #[command(flatten)]
    pub target: AxisTarget,
    /// Search direction (positive/negative, 1/0)
    #[arg(long)]
    pub direction: Direction,
    /// Search speed
    #[arg(long)]
    pub speed: u32,
    /// Pulse output mode
    #[arg(long, default_value_t = 0)]
    pub output_mode: u8,
}

#[derive(Args, Debug)]
pub struct JogArgs {
    #[command(flatten)]
    pub target: AxisTarget,
    /// Travel direction (positive/negative, 1/0)
    #[arg(long)]
    pub direction: Direction,
    /// Start speed (Vo)
    #[arg(long, default_value_t = 0)]
    pub start_speed: u32,
    /// Target speed (Vt)
    #[arg(long)]
    pub target_speed: u32,
    /// Use the high-frequency band
    #[arg(long)]
    pub high: bool,
    /// Pulse output mode
    #[arg(long, default_value_t = 0)]
    pub output_mode: u8,
}

#[derive(Args, Debug)]
pub struct JogSpeedArgs {
    #[command(flatten)]
    pub target: AxisTarget,
    /// Start speed (Vo)
    #[arg(long, default_value_t = 0)]
    pub start_speed: u32,
    /// New target speed (Vt)
    #[arg(long)]
    pub target_speed: u32,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[command(flatten)]
    pub target: AxisTarget,
    /// Travel direction (positive/negative, 1/0)
    #[arg(long)]
    pub direction: Direction,
    /// Distance in pulses
    #[arg(long)]
    pub length: u32,
    /// Speed curve selector
    #[arg(long, default_value_t = 0)]
    pub curve: u32,
    /// Pulse output mode
    #[arg(long, default_value_t = 0)]
    pub output_mode: u8,
    /// Start speed (Vo)
    #[arg(long, default_value_t = 1000)]
    pub start_speed: u32,
    /// Target speed (Vt)
    #[arg(long, default_value_t = 40000)]
    pub target_speed: u32,
    /// Deceleration start point, 0 lets the driver decide
    #[arg(long, default_value_t = 0)]
    pub start_dec: u32,
    /// Acceleration time
    #[arg(long, default_value_t = 100)]
    pub acc_time: u32,
    /// Deceleration time
    #[arg(long, default_value_t = 100)]
    pub dec_time: u32,
    /// Wait until the axis stops and print its status
    #[arg(short, long)]
    pub wait: bool,
    /// Status poll interval while waiting, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub poll_ms: u64,
    /// Give up waiting after this many milliseconds
    #[arg(long, default_value_t = 120_000)]
    pub timeout_ms: u64,
}

impl MoveArgs {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode(self.output_mode)
    }
}

#[derive(Subcommand, Debug)]
pub enum EncoderCommands {
    /// Configure the encoder input
    Configure {
        #[command(flatten)]
        target: AxisTarget,
        /// Counting mode selector
        #[arg(long, default_value_t = 0)]
        mode: i32,
        /// Preset the counter to 0x8000
        #[arg(long)]
        preset_8000: bool,
        /// Disable counting
        #[arg(long)]
        disable: bool,
    },

    /// Read the encoder counter
    Read {
        #[command(flatten)]
        target: AxisTarget,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValveArg {
    Open,
    Closed,
}

impl From<ValveArg> for ValveState {
    fn from(value: ValveArg) -> Self {
        match value {
            ValveArg::Open => ValveState::Open,
            ValveArg::Closed => ValveState::Closed,
        }
    }
}

/// Where the stage is now and where it should go.
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Destination in millimetres
    pub target_mm: f64,
    /// Current stage position in millimetres
    #[arg(long = "from")]
    pub from_mm: f64,
    /// Current valve state
    #[arg(long, value_enum, default_value_t = ValveArg::Closed)]
    pub valve: ValveArg,
    /// Current manipulator X offset
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub current_x: i32,
    /// Current manipulator Y offset
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub current_y: i32,
    /// Current rotary angle
    #[arg(long, default_value_t = 5)]
    pub current_rotary: i32,
    /// X offset at the destination, overrides the station preset
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<i32>,
    /// Y offset at the destination, overrides the station preset
    #[arg(long, allow_hyphen_values = true)]
    pub y: Option<i32>,
    /// Rotary angle at the destination
    #[arg(long)]
    pub rotary: Option<i32>,
    /// Stage configuration file, created with defaults if missing
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl TransferArgs {
    pub fn start_state(&self) -> StageState {
        StageState {
            position_mm: self.from_mm,
            valve: self.valve.into(),
            x: self.current_x,
            y: self.current_y,
            rotary_deg: self.current_rotary,
        }
    }

    pub fn request(&self) -> TransferRequest {
        TransferRequest {
            target_mm: self.target_mm,
            x: self.x,
            y: self.y,
            rotary_deg: self.rotary,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum StageCommands {
    /// Transfer the stage to a position
    Goto(TransferArgs),

    /// Print the steps a transfer would take without moving
    Plan(TransferArgs),

    /// Stop the stage axis
    Stop {
        /// Stage configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Fail with [`CliError::DeviceNotFound`] unless `device` is enumerated.
pub fn check_device(controller: &DynController, device: DeviceIndex) -> Result<()> {
    let count = controller.device_count()?;
    let known = u32::try_from(device.raw()).is_ok_and(|index| index < count);
    if !known {
        return Err(CliError::DeviceNotFound(format!(
            "device {device} ({count} connected)"
        ))
        .into());
    }
    Ok(())
}
