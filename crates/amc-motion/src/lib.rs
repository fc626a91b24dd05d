//! Typed, status-checked API over the `Usb_AMC1XE` motion controller.
//!
//! [`MotionDriver`] mirrors the vendor function table with Rust types and
//! [`amc_errors::Result`] returns. Two drivers implement it:
//!
//! - [`UsbDriver`] calls the library loaded by `amc-sys`;
//! - [`SimulatedDriver`] keeps devices, ports and axes in memory.
//!
//! [`Controller`] serializes access to one driver and pairs
//! `openUSB`/`closeUSB` through [`Session`] guards.
//!
//! ```
//! use amc_motion::prelude::*;
//!
//! let controller = Controller::new(SimulatedDriver::default());
//! let _session = controller.session()?;
//! let axis = controller.axis(DeviceIndex::FIRST, AxisId(0));
//! axis.move_relative(&RelativeMove::builder(Direction::Positive, 12_500).build()?)?;
//! let status = axis.wait_until_stopped(
//!     std::time::Duration::ZERO,
//!     std::time::Duration::from_secs(1),
//!     || false,
//! )?;
//! assert_eq!(status.position, 12_500);
//! # Ok::<(), amc_errors::AmcError>(())
//! ```

#![deny(static_mut_refs)]
#![warn(missing_docs)]

pub mod backend;
pub mod controller;
pub mod driver;
pub mod params;
pub mod prelude;
pub mod sim;
pub mod status;
pub mod types;
pub mod usb;

pub use backend::{Backend, DynController};
pub use controller::{Axis, Controller, Session};
pub use driver::MotionDriver;
pub use params::{HomingParams, JogBand, JogParams, MotionProfile, RelativeMove, SpeedAdjustment};
pub use sim::{SimConfig, SimulatedDriver};
pub use types::{
    AxisId, AxisStatus, DeviceIndex, Direction, EncoderConfig, OutputMode, PortBits, RunState,
    SpeedCurve,
};
pub use usb::UsbDriver;
