//! [`MotionDriver`] over the vendor library.

use std::sync::Arc;

use amc_errors::{DeviceError, Result};
use amc_sys::{AmcLibrary, DeltMovArgs, SysError};

use crate::driver::MotionDriver;
use crate::params::{HomingParams, JogParams, RelativeMove, SpeedAdjustment};
use crate::status::{check, check_count};
use crate::types::{AxisId, AxisStatus, DeviceIndex, EncoderConfig, PortBits, RunState};

/// Driver backed by the loaded `Usb_AMC1XE` library.
///
/// Parameters are validated before they reach the library. Every call is
/// logged at `trace` with its raw status.
#[derive(Debug, Clone)]
pub struct UsbDriver {
    library: Arc<AmcLibrary>,
}

impl UsbDriver {
    /// Wrap an already loaded library.
    pub fn new(library: Arc<AmcLibrary>) -> Self {
        Self { library }
    }

    /// Load the library from `AMC_LIBRARY_PATH` or the platform default.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::LibraryUnavailable`] if loading fails.
    pub fn load_default() -> Result<Self> {
        let library = AmcLibrary::load_default().map_err(unavailable)?;
        Ok(Self::new(Arc::new(library)))
    }

    /// Load the library from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::LibraryUnavailable`] if loading fails.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let library = AmcLibrary::load(path).map_err(unavailable)?;
        Ok(Self::new(Arc::new(library)))
    }

    /// The underlying library.
    pub fn library(&self) -> &Arc<AmcLibrary> {
        &self.library
    }
}

/// `DeviceError` is `Clone + Eq`, so the loader error cannot be kept as a
/// source. Its text already carries the path and the libloading cause.
fn unavailable(error: SysError) -> DeviceError {
    tracing::debug!(error = ?error, "Motion library load failed");
    DeviceError::library_unavailable(error.to_string())
}

fn traced(call: &'static str, code: i32) -> std::result::Result<(), DeviceError> {
    tracing::trace!(call, code, "driver call");
    check(call, code)
}

impl MotionDriver for UsbDriver {
    fn name(&self) -> &'static str {
        "usb"
    }

    fn open(&mut self) -> Result<()> {
        traced("openUSB", self.library.open_usb())?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        traced("closeUSB", self.library.close_usb())?;
        Ok(())
    }

    fn device_count(&mut self) -> Result<u32> {
        let count = self.library.get_device_num();
        tracing::trace!(call = "get_device_num", count, "driver call");
        Ok(check_count("get_device_num", count)?)
    }

    fn reset_device(&mut self, dev: DeviceIndex) -> Result<()> {
        traced("Reset_Usb_Device", self.library.reset_usb_device(dev.raw()))?;
        Ok(())
    }

    fn read_input_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        let (code, bits) = self.library.read_port_in(dev.raw());
        traced("Read_Port_In", code)?;
        Ok(PortBits(bits))
    }

    fn read_output_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        let (code, bits) = self.library.read_port_out(dev.raw());
        traced("Read_Port_Out", code)?;
        Ok(PortBits(bits))
    }

    fn write_output_port(&mut self, dev: DeviceIndex, bits: PortBits) -> Result<()> {
        traced(
            "Write_Port_Out",
            self.library.write_port_out(dev.raw(), bits.raw()),
        )?;
        Ok(())
    }

    fn set_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        traced("Set_Port_Out", self.library.set_port_out(dev.raw(), mask.raw()))?;
        Ok(())
    }

    fn clear_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        traced(
            "Reset_Port_Out",
            self.library.reset_port_out(dev.raw(), mask.raw()),
        )?;
        Ok(())
    }

    fn read_axis_status(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<AxisStatus> {
        let (code, raw) = self.library.read_position(dev.raw(), axis.raw());
        traced("Read_Position", code)?;
        Ok(AxisStatus {
            position: raw.position,
            run_state: RunState::from_raw(raw.run_state),
            io_state: raw.io_state,
            sync_io: raw.sync_io,
        })
    }

    fn read_speed(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        let (code, speed) = self.library.read_speed(dev.raw(), axis.raw());
        traced("Read_Speed", code)?;
        Ok(speed)
    }

    fn set_axis_enabled(&mut self, dev: DeviceIndex, axis: AxisId, enabled: bool) -> Result<()> {
        let run_en = u32::from(enabled);
        traced("Set_Axs", self.library.set_axs(dev.raw(), axis.raw(), run_en))?;
        Ok(())
    }

    fn stop_axis(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<()> {
        traced("AxsStop", self.library.axs_stop(dev.raw(), axis.raw()))?;
        Ok(())
    }

    fn home(&mut self, dev: DeviceIndex, axis: AxisId, params: &HomingParams) -> Result<()> {
        params.validate()?;
        let code = self.library.mov_to_org(
            dev.raw(),
            axis.raw(),
            params.direction.raw(),
            params.output_mode.0,
            params.speed,
        );
        traced("MovToOrg", code)?;
        Ok(())
    }

    fn jog_low(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        params.validate()?;
        let code = self.library.fl_continue_mov(
            dev.raw(),
            axis.raw(),
            params.direction.raw(),
            params.output_mode.0,
            params.start_speed,
            params.target_speed,
        );
        traced("FL_ContinueMov", code)?;
        Ok(())
    }

    fn jog_high(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        params.validate()?;
        let code = self.library.fh_continue_mov(
            dev.raw(),
            axis.raw(),
            params.direction.raw(),
            params.output_mode.0,
            params.start_speed,
            params.target_speed,
        );
        traced("FH_ContinueMov", code)?;
        Ok(())
    }

    fn adjust_jog_speed(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        adjustment: &SpeedAdjustment,
    ) -> Result<()> {
        adjustment.validate()?;
        let code = self.library.fh_continue_adjust_speed(
            dev.raw(),
            axis.raw(),
            adjustment.start_speed,
            adjustment.target_speed,
        );
        traced("FH_ContinueAdjustSpeed", code)?;
        Ok(())
    }

    fn move_relative(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        params: &RelativeMove,
    ) -> Result<()> {
        params.validate()?;
        let args = DeltMovArgs {
            curve: params.curve.0,
            dir: params.direction.raw(),
            outmod: params.output_mode.0,
            vo: params.start_speed,
            vt: params.target_speed,
            length: params.length,
            start_dec: params.start_dec,
            acc_time: params.acc_time,
            dec_time: params.dec_time,
        };
        traced("DeltMov", self.library.delt_mov(dev.raw(), axis.raw(), &args))?;
        Ok(())
    }

    fn configure_encoder(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        config: &EncoderConfig,
    ) -> Result<()> {
        let code = self.library.set_encoder(
            dev.raw(),
            axis.as_signed()?,
            config.mode,
            i32::from(config.preset_8000),
            i32::from(config.enabled),
        );
        traced("Set_Encorder", code)?;
        Ok(())
    }

    fn read_encoder(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        let (code, value) = self.library.read_encoder(dev.raw(), axis.as_signed()?);
        traced("Read_Encorder", code)?;
        Ok(value)
    }
}
