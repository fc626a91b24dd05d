//! Serialized, shareable access to one driver.
//!
//! The vendor header says nothing about thread safety, so every call goes
//! through one mutex per driver. `openUSB`/`closeUSB` are paired by
//! reference-counted [`Session`] guards: the first session opens the driver,
//! the last one to drop closes it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use amc_errors::{DeviceError, Result};
use parking_lot::Mutex;

use crate::driver::MotionDriver;
use crate::params::{HomingParams, JogBand, JogParams, RelativeMove, SpeedAdjustment};
use crate::types::{AxisId, AxisStatus, DeviceIndex, EncoderConfig, PortBits};

struct Shared<D> {
    driver: D,
    sessions: usize,
}

/// Cloneable handle to a driver.
pub struct Controller<D> {
    inner: Arc<Mutex<Shared<D>>>,
}

impl<D> Clone for Controller<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: MotionDriver> std::fmt::Debug for Controller<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(shared) => f
                .debug_struct("Controller")
                .field("driver", &shared.driver.name())
                .field("sessions", &shared.sessions)
                .finish(),
            None => f.debug_struct("Controller").finish_non_exhaustive(),
        }
    }
}

impl<D: MotionDriver> Controller<D> {
    /// Take ownership of a closed driver.
    pub fn new(driver: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                driver,
                sessions: 0,
            })),
        }
    }

    /// Name of the wrapped driver.
    pub fn driver_name(&self) -> &'static str {
        self.inner.lock().driver.name()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions
    }

    /// Open the driver if no session is live and return a guard that keeps
    /// it open.
    ///
    /// # Errors
    ///
    /// Returns the `openUSB` failure. No session is counted in that case.
    pub fn session(&self) -> Result<Session<D>> {
        let mut shared = self.inner.lock();
        if shared.sessions == 0 {
            shared.driver.open()?;
            tracing::debug!(driver = shared.driver.name(), "Driver opened");
        }
        shared.sessions += 1;
        Ok(Session {
            controller: self.clone(),
        })
    }

    /// Run `f` with exclusive access to the driver.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn with_driver<T>(&self, f: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let mut shared = self.inner.lock();
        f(&mut shared.driver)
    }

    /// Number of enumerated devices.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn device_count(&self) -> Result<u32> {
        self.with_driver(|d| d.device_count())
    }

    /// Reset one USB device.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn reset_device(&self, dev: DeviceIndex) -> Result<()> {
        tracing::info!(device = %dev, "Resetting device");
        self.with_driver(|d| d.reset_device(dev))
    }

    /// Read the input lines.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn read_input_port(&self, dev: DeviceIndex) -> Result<PortBits> {
        self.with_driver(|d| d.read_input_port(dev))
    }

    /// Read back the output lines.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn read_output_port(&self, dev: DeviceIndex) -> Result<PortBits> {
        self.with_driver(|d| d.read_output_port(dev))
    }

    /// Replace the output byte.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn write_output_port(&self, dev: DeviceIndex, bits: PortBits) -> Result<()> {
        self.with_driver(|d| d.write_output_port(dev, bits))
    }

    /// Raise the output lines in `mask`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn set_output_bits(&self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        self.with_driver(|d| d.set_output_bits(dev, mask))
    }

    /// Lower the output lines in `mask`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn clear_output_bits(&self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        self.with_driver(|d| d.clear_output_bits(dev, mask))
    }

    /// Handle for the per-axis operations.
    pub fn axis(&self, dev: DeviceIndex, axis: AxisId) -> Axis<D> {
        Axis {
            controller: self.clone(),
            device: dev,
            axis,
        }
    }

    fn release(&self) {
        let mut shared = self.inner.lock();
        shared.sessions = shared.sessions.saturating_sub(1);
        if shared.sessions > 0 {
            return;
        }
        match shared.driver.close() {
            Ok(()) => tracing::debug!(driver = shared.driver.name(), "Driver closed"),
            Err(e) => tracing::warn!(driver = shared.driver.name(), error = %e, "Failed to close driver"),
        }
    }
}

/// Keeps the driver open while alive.
#[must_use = "dropping the session closes the driver"]
pub struct Session<D: MotionDriver> {
    controller: Controller<D>,
}

impl<D: MotionDriver> Session<D> {
    /// The controller this session belongs to.
    pub fn controller(&self) -> &Controller<D> {
        &self.controller
    }
}

impl<D: MotionDriver> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<D: MotionDriver> Drop for Session<D> {
    fn drop(&mut self) {
        self.controller.release();
    }
}

/// One axis of one device.
pub struct Axis<D> {
    controller: Controller<D>,
    device: DeviceIndex,
    axis: AxisId,
}

impl<D> Clone for Axis<D> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            device: self.device,
            axis: self.axis,
        }
    }
}

impl<D> std::fmt::Debug for Axis<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Axis")
            .field("device", &self.device)
            .field("axis", &self.axis)
            .finish()
    }
}

impl<D: MotionDriver> Axis<D> {
    /// Device index.
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Axis index.
    pub fn id(&self) -> AxisId {
        self.axis
    }

    /// `Read_Position`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn status(&self) -> Result<AxisStatus> {
        self.controller
            .with_driver(|d| d.read_axis_status(self.device, self.axis))
    }

    /// `Read_Speed`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn speed(&self) -> Result<u32> {
        self.controller
            .with_driver(|d| d.read_speed(self.device, self.axis))
    }

    /// `Set_Axs`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        tracing::debug!(device = %self.device, axis = %self.axis, enabled, "Set axis enable");
        self.controller
            .with_driver(|d| d.set_axis_enabled(self.device, self.axis, enabled))
    }

    /// `AxsStop`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn stop(&self) -> Result<()> {
        tracing::info!(device = %self.device, axis = %self.axis, "Stopping axis");
        self.controller
            .with_driver(|d| d.stop_axis(self.device, self.axis))
    }

    /// `MovToOrg`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before touching the driver, or the driver
    /// failure.
    pub fn home(&self, params: &HomingParams) -> Result<()> {
        params.validate()?;
        tracing::info!(device = %self.device, axis = %self.axis, ?params, "Homing");
        self.controller
            .with_driver(|d| d.home(self.device, self.axis, params))
    }

    /// `FL_ContinueMov` or `FH_ContinueMov`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before touching the driver, or the driver
    /// failure.
    pub fn jog(&self, band: JogBand, params: &JogParams) -> Result<()> {
        params.validate()?;
        tracing::info!(device = %self.device, axis = %self.axis, ?band, ?params, "Jogging");
        self.controller
            .with_driver(|d| d.jog(self.device, self.axis, band, params))
    }

    /// `FH_ContinueAdjustSpeed`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before touching the driver, or the driver
    /// failure.
    pub fn adjust_jog_speed(&self, adjustment: &SpeedAdjustment) -> Result<()> {
        adjustment.validate()?;
        self.controller
            .with_driver(|d| d.adjust_jog_speed(self.device, self.axis, adjustment))
    }

    /// `DeltMov`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before touching the driver, or the driver
    /// failure.
    pub fn move_relative(&self, params: &RelativeMove) -> Result<()> {
        params.validate()?;
        tracing::info!(
            device = %self.device,
            axis = %self.axis,
            direction = %params.direction,
            length = params.length,
            "Relative move"
        );
        self.controller
            .with_driver(|d| d.move_relative(self.device, self.axis, params))
    }

    /// `Set_Encorder`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn configure_encoder(&self, config: &EncoderConfig) -> Result<()> {
        self.controller
            .with_driver(|d| d.configure_encoder(self.device, self.axis, config))
    }

    /// `Read_Encorder`.
    ///
    /// # Errors
    ///
    /// Returns the driver failure.
    pub fn read_encoder(&self) -> Result<u32> {
        self.controller
            .with_driver(|d| d.read_encoder(self.device, self.axis))
    }

    /// Poll the status every `poll` until the axis stops.
    ///
    /// `should_abort` is checked between polls. When it returns `true`, or
    /// when `timeout` elapses, the axis is stopped and the wait fails with
    /// [`DeviceError::Stopped`] or [`DeviceError::Timeout`]. The driver lock
    /// is not held while sleeping.
    ///
    /// # Errors
    ///
    /// Returns the abort or timeout error, or the first driver failure.
    pub fn wait_until_stopped(
        &self,
        poll: Duration,
        timeout: Duration,
        mut should_abort: impl FnMut() -> bool,
    ) -> Result<AxisStatus> {
        let started = Instant::now();
        loop {
            let status = self.status()?;
            if !status.is_moving() {
                return Ok(status);
            }
            if should_abort() {
                self.stop()?;
                return Err(DeviceError::Stopped {
                    device: self.device.raw(),
                    axis: self.axis.raw(),
                }
                .into());
            }
            if started.elapsed() >= timeout {
                self.stop()?;
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(DeviceError::timeout("wait_until_stopped", timeout_ms).into());
            }
            std::thread::sleep(poll);
        }
    }
}
