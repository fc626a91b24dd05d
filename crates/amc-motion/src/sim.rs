//! In-memory controller implementing [`MotionDriver`].
//!
//! Axes move a fixed number of pulses each time their status is read, so a
//! caller polling `Read_Position` sees a move progress and finish without
//! any wall-clock timing. Homing drives the counter to zero by the shortest
//! way. Jogs run until stopped.
//!
//! Status codes produced by the simulator itself:
//!
//! | code | meaning |
//! |---|---|
//! | [`SIM_STATUS_AXIS_DISABLED`] | motion command on a disabled axis |
//! | [`SIM_STATUS_NOT_JOGGING`] | speed adjustment without a high-frequency jog |

use std::sync::Arc;

use amc_errors::{DeviceError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::driver::MotionDriver;
use crate::params::{HomingParams, JogBand, JogParams, RelativeMove, SpeedAdjustment};
use crate::types::{AxisId, AxisStatus, DeviceIndex, Direction, EncoderConfig, PortBits, RunState};

/// Status returned when a motion command targets a disabled axis.
pub const SIM_STATUS_AXIS_DISABLED: i32 = 2;
/// Status returned by `FH_ContinueAdjustSpeed` when no high-frequency jog runs.
pub const SIM_STATUS_NOT_JOGGING: i32 = 3;

/// Encoder value after a configure with `preset_8000`.
const ENCODER_PRESET: u32 = 0x8000;

/// Shape of the simulated hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of enumerated devices.
    pub devices: u32,
    /// Axes on every device.
    pub axes_per_device: u32,
    /// Pulses an axis travels per status read. Values below 1 count as 1.
    pub pulses_per_poll: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            devices: 1,
            axes_per_device: 4,
            pulses_per_poll: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Relative {
        direction: Direction,
        remaining: u32,
        speed: u32,
    },
    Homing {
        speed: u32,
    },
    Jog {
        band: JogBand,
        direction: Direction,
        speed: u32,
    },
}

impl Motion {
    fn speed(self) -> u32 {
        match self {
            Motion::Relative { speed, .. } | Motion::Homing { speed } | Motion::Jog { speed, .. } => {
                speed
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SimEncoder {
    enabled: bool,
    origin: u32,
    base: u32,
}

#[derive(Debug, Clone)]
struct SimAxis {
    enabled: bool,
    position: u32,
    motion: Option<Motion>,
    io_state: u8,
    encoder: SimEncoder,
}

impl SimAxis {
    fn new() -> Self {
        Self {
            enabled: true,
            position: 0,
            motion: None,
            io_state: 0,
            encoder: SimEncoder {
                enabled: true,
                origin: 0,
                base: 0,
            },
        }
    }

    fn shift(&mut self, direction: Direction, delta: u32) {
        self.position = match direction {
            Direction::Positive => self.position.wrapping_add(delta),
            Direction::Negative => self.position.wrapping_sub(delta),
        };
    }

    fn advance(&mut self, step: u32) {
        let Some(motion) = self.motion else {
            return;
        };
        match motion {
            Motion::Relative {
                direction,
                remaining,
                speed,
            } => {
                let delta = remaining.min(step);
                self.shift(direction, delta);
                let remaining = remaining - delta;
                self.motion = (remaining > 0).then_some(Motion::Relative {
                    direction,
                    remaining,
                    speed,
                });
            }
            Motion::Homing { .. } => {
                let signed = self.position.cast_signed();
                let distance = signed.unsigned_abs();
                let delta = distance.min(step);
                let direction = if signed > 0 {
                    Direction::Negative
                } else {
                    Direction::Positive
                };
                self.shift(direction, delta);
                if self.position == 0 {
                    self.motion = None;
                }
            }
            Motion::Jog { direction, .. } => self.shift(direction, step),
        }
    }

    fn status(&self) -> AxisStatus {
        AxisStatus {
            position: self.position,
            run_state: RunState::from_raw(u8::from(self.motion.is_some())),
            io_state: self.io_state,
            sync_io: 0,
        }
    }

    fn encoder_value(&self) -> u32 {
        if self.encoder.enabled {
            self.encoder
                .base
                .wrapping_add(self.position.wrapping_sub(self.encoder.origin))
        } else {
            self.encoder.base
        }
    }
}

#[derive(Debug, Clone)]
struct SimDevice {
    input: PortBits,
    output: PortBits,
    axes: Vec<SimAxis>,
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    open: bool,
    devices: Vec<SimDevice>,
    failures: Vec<(&'static str, i32)>,
    journal: Vec<&'static str>,
}

impl SimState {
    /// Record `call`, apply an injected failure and require an open driver.
    fn enter(&mut self, call: &'static str) -> std::result::Result<(), DeviceError> {
        self.journal.push(call);
        if let Some(pos) = self.failures.iter().position(|(name, _)| *name == call) {
            let (_, code) = self.failures.remove(pos);
            tracing::debug!(call, code, "Injected driver failure");
            return Err(DeviceError::status(call, code));
        }
        if !self.open {
            return Err(DeviceError::NotOpen);
        }
        Ok(())
    }

    fn device(&mut self, dev: DeviceIndex) -> std::result::Result<&mut SimDevice, DeviceError> {
        let available = i32::try_from(self.devices.len()).unwrap_or(i32::MAX);
        usize::try_from(dev.raw())
            .ok()
            .and_then(|index| self.devices.get_mut(index))
            .ok_or(DeviceError::NotFound {
                device: dev.raw(),
                available,
            })
    }

    fn axis(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
    ) -> std::result::Result<&mut SimAxis, DeviceError> {
        let device = self.device(dev)?;
        usize::try_from(axis.raw())
            .ok()
            .and_then(|index| device.axes.get_mut(index))
            .ok_or(DeviceError::InvalidAxis {
                device: dev.raw(),
                axis: axis.raw(),
            })
    }

    fn step(&self) -> u32 {
        self.config.pulses_per_poll.max(1)
    }

    /// Start `motion` on an idle, enabled axis.
    fn start(
        &mut self,
        call: &'static str,
        dev: DeviceIndex,
        axis: AxisId,
        motion: Motion,
    ) -> std::result::Result<(), DeviceError> {
        self.enter(call)?;
        let target = self.axis(dev, axis)?;
        if !target.enabled {
            return Err(DeviceError::status(call, SIM_STATUS_AXIS_DISABLED));
        }
        if target.motion.is_some() {
            return Err(DeviceError::Busy {
                device: dev.raw(),
                axis: axis.raw(),
            });
        }
        target.motion = Some(motion);
        tracing::debug!(call, device = %dev, axis = %axis, ?motion, "Simulated motion started");
        Ok(())
    }
}

/// Simulated controller.
///
/// Clones share the same state, so a test can keep a handle for inspection
/// and failure injection while a [`crate::Controller`] owns another.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedDriver {
    /// Create a closed simulator with the given shape.
    pub fn new(config: SimConfig) -> Self {
        let axes = usize::try_from(config.axes_per_device).unwrap_or(0);
        let device = SimDevice {
            input: PortBits::NONE,
            output: PortBits::NONE,
            axes: vec![SimAxis::new(); axes],
        };
        let devices = usize::try_from(config.devices).unwrap_or(0);
        Self {
            state: Arc::new(Mutex::new(SimState {
                config,
                open: false,
                devices: vec![device; devices],
                failures: Vec::new(),
                journal: Vec::new(),
            })),
        }
    }

    /// Make the next invocation of `call` (C name) fail with `code`.
    pub fn fail_next(&self, call: &'static str, code: i32) {
        self.state.lock().failures.push((call, code));
    }

    /// C names of every call made so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state.lock().journal.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Whether `openUSB` has been called without a matching `closeUSB`.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Drive the input lines of a device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotFound`] for an unknown device.
    pub fn set_input_port(
        &self,
        dev: DeviceIndex,
        bits: PortBits,
    ) -> std::result::Result<(), DeviceError> {
        self.state.lock().device(dev)?.input = bits;
        Ok(())
    }

    /// Drive the IO state byte reported for an axis.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or axis.
    pub fn set_axis_io(
        &self,
        dev: DeviceIndex,
        axis: AxisId,
        io_state: u8,
    ) -> std::result::Result<(), DeviceError> {
        self.state.lock().axis(dev, axis)?.io_state = io_state;
        Ok(())
    }

    /// Position counter without advancing any motion.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or axis.
    pub fn position(&self, dev: DeviceIndex, axis: AxisId) -> std::result::Result<u32, DeviceError> {
        Ok(self.state.lock().axis(dev, axis)?.position)
    }

    /// Whether the axis is executing a motion, without advancing it.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or axis.
    pub fn is_moving(&self, dev: DeviceIndex, axis: AxisId) -> std::result::Result<bool, DeviceError> {
        Ok(self.state.lock().axis(dev, axis)?.motion.is_some())
    }

    /// Whether the axis is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or axis.
    pub fn is_enabled(&self, dev: DeviceIndex, axis: AxisId) -> std::result::Result<bool, DeviceError> {
        Ok(self.state.lock().axis(dev, axis)?.enabled)
    }
}

impl MotionDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.journal.push("openUSB");
        if let Some(pos) = state.failures.iter().position(|(name, _)| *name == "openUSB") {
            let (_, code) = state.failures.remove(pos);
            return Err(DeviceError::status("openUSB", code).into());
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("closeUSB")?;
        state.open = false;
        Ok(())
    }

    fn device_count(&mut self) -> Result<u32> {
        let mut state = self.state.lock();
        state.enter("get_device_num")?;
        Ok(state.config.devices)
    }

    fn reset_device(&mut self, dev: DeviceIndex) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Reset_Usb_Device")?;
        let device = state.device(dev)?;
        device.output = PortBits::NONE;
        for axis in &mut device.axes {
            axis.motion = None;
        }
        Ok(())
    }

    fn read_input_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        let mut state = self.state.lock();
        state.enter("Read_Port_In")?;
        Ok(state.device(dev)?.input)
    }

    fn read_output_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        let mut state = self.state.lock();
        state.enter("Read_Port_Out")?;
        Ok(state.device(dev)?.output)
    }

    fn write_output_port(&mut self, dev: DeviceIndex, bits: PortBits) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Write_Port_Out")?;
        state.device(dev)?.output = bits;
        Ok(())
    }

    fn set_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Set_Port_Out")?;
        let device = state.device(dev)?;
        device.output = device.output.with(mask);
        Ok(())
    }

    fn clear_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Reset_Port_Out")?;
        let device = state.device(dev)?;
        device.output = device.output.without(mask);
        Ok(())
    }

    fn read_axis_status(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<AxisStatus> {
        let mut state = self.state.lock();
        state.enter("Read_Position")?;
        let step = state.step();
        let target = state.axis(dev, axis)?;
        target.advance(step);
        Ok(target.status())
    }

    fn read_speed(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        let mut state = self.state.lock();
        state.enter("Read_Speed")?;
        Ok(state.axis(dev, axis)?.motion.map_or(0, Motion::speed))
    }

    fn set_axis_enabled(&mut self, dev: DeviceIndex, axis: AxisId, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Set_Axs")?;
        let target = state.axis(dev, axis)?;
        target.enabled = enabled;
        if !enabled {
            target.motion = None;
        }
        Ok(())
    }

    fn stop_axis(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("AxsStop")?;
        state.axis(dev, axis)?.motion = None;
        Ok(())
    }

    fn home(&mut self, dev: DeviceIndex, axis: AxisId, params: &HomingParams) -> Result<()> {
        params.validate()?;
        let motion = Motion::Homing {
            speed: params.speed,
        };
        self.state.lock().start("MovToOrg", dev, axis, motion)?;
        Ok(())
    }

    fn jog_low(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        params.validate()?;
        let motion = Motion::Jog {
            band: JogBand::Low,
            direction: params.direction,
            speed: params.target_speed,
        };
        self.state.lock().start("FL_ContinueMov", dev, axis, motion)?;
        Ok(())
    }

    fn jog_high(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        params.validate()?;
        let motion = Motion::Jog {
            band: JogBand::High,
            direction: params.direction,
            speed: params.target_speed,
        };
        self.state.lock().start("FH_ContinueMov", dev, axis, motion)?;
        Ok(())
    }

    fn adjust_jog_speed(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        adjustment: &SpeedAdjustment,
    ) -> Result<()> {
        const CALL: &str = "FH_ContinueAdjustSpeed";
        adjustment.validate()?;
        let mut state = self.state.lock();
        state.enter(CALL)?;
        let target = state.axis(dev, axis)?;
        match target.motion {
            Some(Motion::Jog {
                band: JogBand::High,
                direction,
                ..
            }) => {
                target.motion = Some(Motion::Jog {
                    band: JogBand::High,
                    direction,
                    speed: adjustment.target_speed,
                });
                Ok(())
            }
            _ => Err(DeviceError::status(CALL, SIM_STATUS_NOT_JOGGING).into()),
        }
    }

    fn move_relative(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        params: &RelativeMove,
    ) -> Result<()> {
        params.validate()?;
        let motion = Motion::Relative {
            direction: params.direction,
            remaining: params.length,
            speed: params.target_speed,
        };
        self.state.lock().start("DeltMov", dev, axis, motion)?;
        Ok(())
    }

    fn configure_encoder(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        config: &EncoderConfig,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("Set_Encorder")?;
        let target = state.axis(dev, axis)?;
        let current = target.encoder_value();
        target.encoder = SimEncoder {
            enabled: config.enabled,
            origin: target.position,
            base: if config.preset_8000 {
                ENCODER_PRESET
            } else {
                current
            },
        };
        Ok(())
    }

    fn read_encoder(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        let mut state = self.state.lock();
        state.enter("Read_Encorder")?;
        Ok(state.axis(dev, axis)?.encoder_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_errors::AmcError;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const DEV: DeviceIndex = DeviceIndex::FIRST;
    const AXIS: AxisId = AxisId(0);

    fn open_sim(pulses_per_poll: u32) -> std::result::Result<SimulatedDriver, AmcError> {
        let mut sim = SimulatedDriver::new(SimConfig {
            pulses_per_poll,
            ..SimConfig::default()
        });
        sim.open()?;
        Ok(sim)
    }

    #[test]
    fn test_calls_require_open() {
        let mut sim = SimulatedDriver::default();
        let result = sim.read_input_port(DEV);
        assert!(matches!(
            result,
            Err(AmcError::Device(DeviceError::NotOpen))
        ));
    }

    #[test]
    fn test_relative_move_finishes() -> TestResult {
        let mut sim = open_sim(4000)?;
        let mv = RelativeMove::builder(Direction::Positive, 10_000).build()?;
        sim.move_relative(DEV, AXIS, &mv)?;

        let mut polls = 0;
        loop {
            polls += 1;
            let status = sim.read_axis_status(DEV, AXIS)?;
            if !status.is_moving() {
                assert_eq!(status.position, 10_000);
                break;
            }
        }
        assert_eq!(polls, 3);
        Ok(())
    }

    #[test]
    fn test_negative_move_wraps_counter() -> TestResult {
        let mut sim = open_sim(100)?;
        let mv = RelativeMove::builder(Direction::Negative, 10).build()?;
        sim.move_relative(DEV, AXIS, &mv)?;
        let status = sim.read_axis_status(DEV, AXIS)?;
        assert_eq!(status.position, u32::MAX - 9);
        assert_eq!(status.run_state, RunState::Stopped);
        Ok(())
    }

    #[test]
    fn test_homing_takes_shortest_way() -> TestResult {
        let mut sim = open_sim(100)?;
        let mv = RelativeMove::builder(Direction::Negative, 150).build()?;
        sim.move_relative(DEV, AXIS, &mv)?;
        sim.read_axis_status(DEV, AXIS)?;
        sim.read_axis_status(DEV, AXIS)?;

        sim.home(DEV, AXIS, &HomingParams::new(Direction::Negative, 500))?;
        assert!(sim.read_axis_status(DEV, AXIS)?.is_moving());
        let status = sim.read_axis_status(DEV, AXIS)?;
        assert_eq!(status.position, 0);
        assert!(!status.is_moving());
        Ok(())
    }

    #[test]
    fn test_stop_freezes_position() -> TestResult {
        let mut sim = open_sim(100)?;
        sim.jog_low(DEV, AXIS, &JogParams::new(Direction::Positive, 10, 100))?;
        sim.read_axis_status(DEV, AXIS)?;
        sim.stop_axis(DEV, AXIS)?;
        let first = sim.read_axis_status(DEV, AXIS)?;
        let second = sim.read_axis_status(DEV, AXIS)?;
        assert_eq!(first.position, 100);
        assert_eq!(second.position, 100);
        assert_eq!(sim.read_speed(DEV, AXIS)?, 0);
        Ok(())
    }

    #[test]
    fn test_second_motion_is_busy() -> TestResult {
        let mut sim = open_sim(100)?;
        let mv = RelativeMove::builder(Direction::Positive, 1000).build()?;
        sim.move_relative(DEV, AXIS, &mv)?;
        let result = sim.move_relative(DEV, AXIS, &mv);
        assert!(matches!(
            result,
            Err(AmcError::Device(DeviceError::Busy { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_disabled_axis_rejects_motion() -> TestResult {
        let mut sim = open_sim(100)?;
        sim.set_axis_enabled(DEV, AXIS, false)?;
        let result = sim.jog_high(DEV, AXIS, &JogParams::new(Direction::Positive, 1, 2));
        assert!(matches!(
            result,
            Err(AmcError::Device(DeviceError::Status {
                call: "FH_ContinueMov",
                code: SIM_STATUS_AXIS_DISABLED
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_adjust_speed_needs_high_jog() -> TestResult {
        let mut sim = open_sim(100)?;
        let adjustment = SpeedAdjustment {
            start_speed: 10,
            target_speed: 900,
        };
        assert!(sim.adjust_jog_speed(DEV, AXIS, &adjustment).is_err());

        sim.jog_high(DEV, AXIS, &JogParams::new(Direction::Positive, 10, 100))?;
        sim.adjust_jog_speed(DEV, AXIS, &adjustment)?;
        assert_eq!(sim.read_speed(DEV, AXIS)?, 900);
        Ok(())
    }

    #[test]
    fn test_port_semantics() -> TestResult {
        let mut sim = open_sim(100)?;
        sim.write_output_port(DEV, PortBits(0b1000_0001))?;
        sim.set_output_bits(DEV, PortBits(0b0000_0110))?;
        assert_eq!(sim.read_output_port(DEV)?, PortBits(0b1000_0111));
        sim.clear_output_bits(DEV, PortBits(0b1000_0010))?;
        assert_eq!(sim.read_output_port(DEV)?, PortBits(0b0000_0101));

        sim.set_input_port(DEV, PortBits(0x5A))?;
        assert_eq!(sim.read_input_port(DEV)?, PortBits(0x5A));
        Ok(())
    }

    #[test]
    fn test_encoder_preset_and_follow() -> TestResult {
        let mut sim = open_sim(50)?;
        sim.configure_encoder(
            DEV,
            AXIS,
            &EncoderConfig {
                mode: 0,
                preset_8000: true,
                enabled: true,
            },
        )?;
        sim.jog_low(DEV, AXIS, &JogParams::new(Direction::Positive, 1, 2))?;
        sim.read_axis_status(DEV, AXIS)?;
        assert_eq!(sim.read_encoder(DEV, AXIS)?, 0x8000 + 50);
        Ok(())
    }

    #[test]
    fn test_injected_failure_fires_once() -> TestResult {
        let mut sim = open_sim(100)?;
        sim.fail_next("Read_Speed", -7);
        let result = sim.read_speed(DEV, AXIS);
        assert!(matches!(
            result,
            Err(AmcError::Device(DeviceError::Status {
                call: "Read_Speed",
                code: -7
            }))
        ));
        assert_eq!(sim.read_speed(DEV, AXIS)?, 0);
        Ok(())
    }

    #[test]
    fn test_unknown_device_and_axis() -> TestResult {
        let mut sim = open_sim(100)?;
        assert!(matches!(
            sim.read_input_port(DeviceIndex(3)),
            Err(AmcError::Device(DeviceError::NotFound {
                device: 3,
                available: 1
            }))
        ));
        assert!(matches!(
            sim.read_axis_status(DEV, AxisId(9)),
            Err(AmcError::Device(DeviceError::InvalidAxis { axis: 9, .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_journal_records_c_names() -> TestResult {
        let mut sim = open_sim(100)?;
        sim.device_count()?;
        sim.close()?;
        assert_eq!(sim.call_names(), ["openUSB", "get_device_num", "closeUSB"]);
        Ok(())
    }
}
