//! Common imports for driver users.

pub use crate::backend::{Backend, DynController};
pub use crate::controller::{Axis, Controller, Session};
pub use crate::driver::MotionDriver;
pub use crate::params::{
    HomingParams, JogBand, JogParams, MotionProfile, RelativeMove, SpeedAdjustment,
};
pub use crate::sim::{SimConfig, SimulatedDriver};
pub use crate::types::{
    AxisId, AxisStatus, DeviceIndex, Direction, EncoderConfig, OutputMode, PortBits, RunState,
    SpeedCurve,
};
pub use crate::usb::UsbDriver;
