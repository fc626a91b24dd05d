//! Checked-pointer call wrappers.
//!
//! Each method forwards to the matching entry of [`AmcApi`](crate::AmcApi)
//! and returns the raw status code untouched. Out-parameters are local
//! variables owned by the wrapper and returned alongside the status, so
//! callers never handle raw pointers. Status interpretation is left to
//! higher layers.

use std::ffi::{c_int, c_uchar, c_uint};

use crate::loader::AmcLibrary;

/// Raw values written by `Read_Position`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawPosition {
    /// `Pos`
    pub position: c_uint,
    /// `RunState`
    pub run_state: c_uchar,
    /// `IOState`
    pub io_state: c_uchar,
    /// `SyncIO`
    pub sync_io: c_uchar,
}

/// Arguments of `DeltMov`, in header order after `dev` and `Axs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltMovArgs {
    /// `curve`
    pub curve: c_uint,
    /// `Dir`
    pub dir: c_uint,
    /// `Outmod`
    pub outmod: c_uchar,
    /// `Vo`
    pub vo: c_uint,
    /// `Vt`
    pub vt: c_uint,
    /// `Length`
    pub length: c_uint,
    /// `StartDec`
    pub start_dec: c_uint,
    /// `Acctime`
    pub acc_time: c_uint,
    /// `Dectime`
    pub dec_time: c_uint,
}

impl AmcLibrary {
    /// `openUSB`
    pub fn open_usb(&self) -> c_int {
        // SAFETY: the pointer was resolved from this still-loaded library.
        unsafe { (self.api().open_usb)() }
    }

    /// `closeUSB`
    pub fn close_usb(&self) -> c_int {
        // SAFETY: the pointer was resolved from this still-loaded library.
        unsafe { (self.api().close_usb)() }
    }

    /// `get_device_num`
    pub fn get_device_num(&self) -> c_int {
        // SAFETY: the pointer was resolved from this still-loaded library.
        unsafe { (self.api().get_device_num)() }
    }

    /// `Reset_Usb_Device`
    pub fn reset_usb_device(&self, dev: c_int) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().reset_usb_device)(dev) }
    }

    /// `Read_Port_In`
    pub fn read_port_in(&self, dev: c_int) -> (c_int, c_uchar) {
        let mut port: c_uchar = 0;
        // SAFETY: `port` is a live local valid for one byte write.
        let status = unsafe { (self.api().read_port_in)(dev, &raw mut port) };
        (status, port)
    }

    /// `Read_Port_Out`
    pub fn read_port_out(&self, dev: c_int) -> (c_int, c_uchar) {
        let mut port: c_uchar = 0;
        // SAFETY: `port` is a live local valid for one byte write.
        let status = unsafe { (self.api().read_port_out)(dev, &raw mut port) };
        (status, port)
    }

    /// `Write_Port_Out`
    pub fn write_port_out(&self, dev: c_int, port: c_uchar) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().write_port_out)(dev, port) }
    }

    /// `Set_Port_Out`
    pub fn set_port_out(&self, dev: c_int, port: c_uchar) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().set_port_out)(dev, port) }
    }

    /// `Reset_Port_Out`
    pub fn reset_port_out(&self, dev: c_int, port: c_uchar) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().reset_port_out)(dev, port) }
    }

    /// `Read_Position`
    pub fn read_position(&self, dev: c_int, axis: c_uint) -> (c_int, RawPosition) {
        let mut out = RawPosition::default();
        // SAFETY: the four out-pointers are distinct fields of a live local.
        let status = unsafe {
            (self.api().read_position)(
                dev,
                axis,
                &raw mut out.position,
                &raw mut out.run_state,
                &raw mut out.io_state,
                &raw mut out.sync_io,
            )
        };
        (status, out)
    }

    /// `Read_Speed`
    pub fn read_speed(&self, dev: c_int, axis: c_uint) -> (c_int, c_uint) {
        let mut speed: c_uint = 0;
        // SAFETY: `speed` is a live local valid for one write.
        let status = unsafe { (self.api().read_speed)(dev, axis, &raw mut speed) };
        (status, speed)
    }

    /// `Set_Axs`
    pub fn set_axs(&self, dev: c_int, axis: c_uint, run_en: c_uint) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().set_axs)(dev, axis, run_en) }
    }

    /// `AxsStop`
    pub fn axs_stop(&self, dev: c_int, axis: c_uint) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().axs_stop)(dev, axis) }
    }

    /// `MovToOrg`
    pub fn mov_to_org(
        &self,
        dev: c_int,
        axis: c_uint,
        dir: c_uint,
        outmod: c_uchar,
        speed: c_uint,
    ) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().mov_to_org)(dev, axis, dir, outmod, speed) }
    }

    /// `FL_ContinueMov`
    pub fn fl_continue_mov(
        &self,
        dev: c_int,
        axis: c_uint,
        dir: c_uint,
        outmod: c_uchar,
        vo: c_uint,
        vt: c_uint,
    ) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().fl_continue_mov)(dev, axis, dir, outmod, vo, vt) }
    }

    /// `FH_ContinueMov`
    pub fn fh_continue_mov(
        &self,
        dev: c_int,
        axis: c_uint,
        dir: c_uint,
        outmod: c_uchar,
        vo: c_uint,
        vt: c_uint,
    ) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().fh_continue_mov)(dev, axis, dir, outmod, vo, vt) }
    }

    /// `FH_ContinueAdjustSpeed`
    pub fn fh_continue_adjust_speed(
        &self,
        dev: c_int,
        axis: c_uint,
        vo: c_uint,
        vt: c_uint,
    ) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().fh_continue_adjust_speed)(dev, axis, vo, vt) }
    }

    /// `DeltMov`
    pub fn delt_mov(&self, dev: c_int, axis: c_uint, args: &DeltMovArgs) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe {
            (self.api().delt_mov)(
                dev,
                axis,
                args.curve,
                args.dir,
                args.outmod,
                args.vo,
                args.vt,
                args.length,
                args.start_dec,
                args.acc_time,
                args.dec_time,
            )
        }
    }

    /// `Set_Encorder`
    pub fn set_encoder(
        &self,
        dev: c_int,
        axis: c_int,
        mode: c_int,
        set8000: c_int,
        enable: c_int,
    ) -> c_int {
        // SAFETY: by-value arguments only; the library is still loaded.
        unsafe { (self.api().set_encoder)(dev, axis, mode, set8000, enable) }
    }

    /// `Read_Encorder`
    pub fn read_encoder(&self, dev: c_int, axis: c_int) -> (c_int, c_uint) {
        let mut value: c_uint = 0;
        // SAFETY: `value` is a live local valid for one write.
        let status = unsafe { (self.api().read_encoder)(dev, axis, &raw mut value) };
        (status, value)
    }
}
