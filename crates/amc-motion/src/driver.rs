//! The driver contract shared by the USB binding and the simulator.

use amc_errors::Result;

use crate::params::{HomingParams, JogBand, JogParams, RelativeMove, SpeedAdjustment};
use crate::types::{AxisId, AxisStatus, DeviceIndex, EncoderConfig, PortBits};

/// One method per function exported by the vendor library.
///
/// Implementations report a non-zero driver status as
/// [`amc_errors::DeviceError::Status`] and never retry on their own.
/// Callers that share a driver between threads go through
/// [`crate::Controller`], which serializes access.
pub trait MotionDriver: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// `openUSB`: make the enumerated devices addressable.
    fn open(&mut self) -> Result<()>;

    /// `closeUSB`: release every device.
    fn close(&mut self) -> Result<()>;

    /// `get_device_num`: number of enumerated devices.
    fn device_count(&mut self) -> Result<u32>;

    /// `Reset_Usb_Device`
    fn reset_device(&mut self, dev: DeviceIndex) -> Result<()>;

    /// `Read_Port_In`
    fn read_input_port(&mut self, dev: DeviceIndex) -> Result<PortBits>;

    /// `Read_Port_Out`
    fn read_output_port(&mut self, dev: DeviceIndex) -> Result<PortBits>;

    /// `Write_Port_Out`: replace the whole output byte.
    fn write_output_port(&mut self, dev: DeviceIndex, bits: PortBits) -> Result<()>;

    /// `Set_Port_Out`: raise the lines in `mask`.
    fn set_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()>;

    /// `Reset_Port_Out`: lower the lines in `mask`.
    fn clear_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()>;

    /// `Read_Position`
    fn read_axis_status(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<AxisStatus>;

    /// `Read_Speed`
    fn read_speed(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32>;

    /// `Set_Axs`
    fn set_axis_enabled(&mut self, dev: DeviceIndex, axis: AxisId, enabled: bool) -> Result<()>;

    /// `AxsStop`
    fn stop_axis(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<()>;

    /// `MovToOrg`
    fn home(&mut self, dev: DeviceIndex, axis: AxisId, params: &HomingParams) -> Result<()>;

    /// `FL_ContinueMov`
    fn jog_low(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()>;

    /// `FH_ContinueMov`
    fn jog_high(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()>;

    /// `FH_ContinueAdjustSpeed`
    fn adjust_jog_speed(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        adjustment: &SpeedAdjustment,
    ) -> Result<()>;

    /// `DeltMov`
    fn move_relative(&mut self, dev: DeviceIndex, axis: AxisId, params: &RelativeMove)
    -> Result<()>;

    /// `Set_Encorder`
    fn configure_encoder(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        config: &EncoderConfig,
    ) -> Result<()>;

    /// `Read_Encorder`
    fn read_encoder(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32>;

    /// Continuous move in the given frequency band.
    fn jog(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        band: JogBand,
        params: &JogParams,
    ) -> Result<()> {
        match band {
            JogBand::Low => self.jog_low(dev, axis, params),
            JogBand::High => self.jog_high(dev, axis, params),
        }
    }
}

impl<T: MotionDriver + ?Sized> MotionDriver for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn device_count(&mut self) -> Result<u32> {
        (**self).device_count()
    }

    fn reset_device(&mut self, dev: DeviceIndex) -> Result<()> {
        (**self).reset_device(dev)
    }

    fn read_input_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        (**self).read_input_port(dev)
    }

    fn read_output_port(&mut self, dev: DeviceIndex) -> Result<PortBits> {
        (**self).read_output_port(dev)
    }

    fn write_output_port(&mut self, dev: DeviceIndex, bits: PortBits) -> Result<()> {
        (**self).write_output_port(dev, bits)
    }

    fn set_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        (**self).set_output_bits(dev, mask)
    }

    fn clear_output_bits(&mut self, dev: DeviceIndex, mask: PortBits) -> Result<()> {
        (**self).clear_output_bits(dev, mask)
    }

    fn read_axis_status(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<AxisStatus> {
        (**self).read_axis_status(dev, axis)
    }

    fn read_speed(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        (**self).read_speed(dev, axis)
    }

    fn set_axis_enabled(&mut self, dev: DeviceIndex, axis: AxisId, enabled: bool) -> Result<()> {
        (**self).set_axis_enabled(dev, axis, enabled)
    }

    fn stop_axis(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<()> {
        (**self).stop_axis(dev, axis)
    }

    fn home(&mut self, dev: DeviceIndex, axis: AxisId, params: &HomingParams) -> Result<()> {
        (**self).home(dev, axis, params)
    }

    fn jog_low(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        (**self).jog_low(dev, axis, params)
    }

    fn jog_high(&mut self, dev: DeviceIndex, axis: AxisId, params: &JogParams) -> Result<()> {
        (**self).jog_high(dev, axis, params)
    }

    fn adjust_jog_speed(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        adjustment: &SpeedAdjustment,
    ) -> Result<()> {
        (**self).adjust_jog_speed(dev, axis, adjustment)
    }

    fn move_relative(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        params: &RelativeMove,
    ) -> Result<()> {
        (**self).move_relative(dev, axis, params)
    }

    fn configure_encoder(
        &mut self,
        dev: DeviceIndex,
        axis: AxisId,
        config: &EncoderConfig,
    ) -> Result<()> {
        (**self).configure_encoder(dev, axis, config)
    }

    fn read_encoder(&mut self, dev: DeviceIndex, axis: AxisId) -> Result<u32> {
        (**self).read_encoder(dev, axis)
    }
}
