//! Raw function table of the vendor library.
//!
//! Names in [`SYMBOLS`] are the exported C names, including the vendor's
//! spelling (`Set_Encorder`, `Read_Encorder`).

use std::ffi::{c_int, c_uchar, c_uint};

/// `int openUSB(void)`
pub type OpenUsbFn = unsafe extern "system" fn() -> c_int;
/// `int closeUSB(void)`
pub type CloseUsbFn = unsafe extern "system" fn() -> c_int;
/// `int get_device_num(void)`
pub type GetDeviceNumFn = unsafe extern "system" fn() -> c_int;
/// `int Reset_Usb_Device(int dev)`
pub type ResetUsbDeviceFn = unsafe extern "system" fn(dev: c_int) -> c_int;
/// `int Read_Port_In(int dev, unsigned char* in_port)` and `Read_Port_Out`.
pub type ReadPortFn = unsafe extern "system" fn(dev: c_int, port: *mut c_uchar) -> c_int;
/// `int Write_Port_Out(int dev, unsigned char out_port)`, `Set_Port_Out`, `Reset_Port_Out`.
pub type WritePortFn = unsafe extern "system" fn(dev: c_int, port: c_uchar) -> c_int;
/// `int Read_Position(int dev, unsigned int Axs, unsigned int* Pos, unsigned char* RunState, unsigned char* IOState, unsigned char* SyncIO)`
pub type ReadPositionFn = unsafe extern "system" fn(
    dev: c_int,
    axis: c_uint,
    position: *mut c_uint,
    run_state: *mut c_uchar,
    io_state: *mut c_uchar,
    sync_io: *mut c_uchar,
) -> c_int;
/// `int Read_Speed(int dev, unsigned int Axs, unsigned int* speed)`
pub type ReadSpeedFn =
    unsafe extern "system" fn(dev: c_int, axis: c_uint, speed: *mut c_uint) -> c_int;
/// `int Set_Axs(int dev, unsigned int Axs, unsigned int Run_EN)`
pub type SetAxsFn = unsafe extern "system" fn(dev: c_int, axis: c_uint, run_en: c_uint) -> c_int;
/// `int AxsStop(int dev, unsigned int Axs)`
pub type AxsStopFn = unsafe extern "system" fn(dev: c_int, axis: c_uint) -> c_int;
/// `int MovToOrg(int dev, unsigned int Axs, unsigned int Dir, unsigned char Outmod, unsigned int Speed)`
pub type MovToOrgFn = unsafe extern "system" fn(
    dev: c_int,
    axis: c_uint,
    dir: c_uint,
    outmod: c_uchar,
    speed: c_uint,
) -> c_int;
/// `int FL_ContinueMov(...)` and `FH_ContinueMov(...)`: continuous move at low/high frequency.
pub type ContinueMovFn = unsafe extern "system" fn(
    dev: c_int,
    axis: c_uint,
    dir: c_uint,
    outmod: c_uchar,
    vo: c_uint,
    vt: c_uint,
) -> c_int;
/// `int FH_ContinueAdjustSpeed(int dev, unsigned int Axs, unsigned int Vo, unsigned int Vt)`
pub type AdjustSpeedFn =
    unsafe extern "system" fn(dev: c_int, axis: c_uint, vo: c_uint, vt: c_uint) -> c_int;
/// `int DeltMov(int dev, unsigned int Axs, unsigned int curve, unsigned int Dir, unsigned char Outmod, unsigned int Vo, unsigned int Vt, unsigned int Length, unsigned int StartDec, unsigned int Acctime, unsigned int Dectime)`
pub type DeltMovFn = unsafe extern "system" fn(
    dev: c_int,
    axis: c_uint,
    curve: c_uint,
    dir: c_uint,
    outmod: c_uchar,
    vo: c_uint,
    vt: c_uint,
    length: c_uint,
    start_dec: c_uint,
    acc_time: c_uint,
    dec_time: c_uint,
) -> c_int;
/// `int Set_Encorder(int dev, int Axs, int mod, int set8000, int enable)`
pub type SetEncoderFn = unsafe extern "system" fn(
    dev: c_int,
    axis: c_int,
    mode: c_int,
    set8000: c_int,
    enable: c_int,
) -> c_int;
/// `int Read_Encorder(int dev, int Axs, unsigned int* Value)`
pub type ReadEncoderFn =
    unsafe extern "system" fn(dev: c_int, axis: c_int, value: *mut c_uint) -> c_int;

/// Every exported symbol, in header order.
pub const SYMBOLS: [&str; 20] = [
    "openUSB",
    "closeUSB",
    "get_device_num",
    "Reset_Usb_Device",
    "Read_Port_In",
    "Read_Port_Out",
    "Write_Port_Out",
    "Set_Port_Out",
    "Reset_Port_Out",
    "Read_Position",
    "Read_Speed",
    "Set_Axs",
    "AxsStop",
    "MovToOrg",
    "FL_ContinueMov",
    "FH_ContinueMov",
    "FH_ContinueAdjustSpeed",
    "DeltMov",
    "Set_Encorder",
    "Read_Encorder",
];

/// Resolved function table.
///
/// The pointers stay valid only while the [`crate::AmcLibrary`] that produced
/// the table is alive.
#[derive(Debug, Clone, Copy)]
pub struct AmcApi {
    /// `openUSB`
    pub open_usb: OpenUsbFn,
    /// `closeUSB`
    pub close_usb: CloseUsbFn,
    /// `get_device_num`
    pub get_device_num: GetDeviceNumFn,
    /// `Reset_Usb_Device`
    pub reset_usb_device: ResetUsbDeviceFn,
    /// `Read_Port_In`
    pub read_port_in: ReadPortFn,
    /// `Read_Port_Out`
    pub read_port_out: ReadPortFn,
    /// `Write_Port_Out`
    pub write_port_out: WritePortFn,
    /// `Set_Port_Out`
    pub set_port_out: WritePortFn,
    /// `Reset_Port_Out`
    pub reset_port_out: WritePortFn,
    /// `Read_Position`
    pub read_position: ReadPositionFn,
    /// `Read_Speed`
    pub read_speed: ReadSpeedFn,
    /// `Set_Axs`
    pub set_axs: SetAxsFn,
    /// `AxsStop`
    pub axs_stop: AxsStopFn,
    /// `MovToOrg`
    pub mov_to_org: MovToOrgFn,
    /// `FL_ContinueMov`
    pub fl_continue_mov: ContinueMovFn,
    /// `FH_ContinueMov`
    pub fh_continue_mov: ContinueMovFn,
    /// `FH_ContinueAdjustSpeed`
    pub fh_continue_adjust_speed: AdjustSpeedFn,
    /// `DeltMov`
    pub delt_mov: DeltMovFn,
    /// `Set_Encorder`
    pub set_encoder: SetEncoderFn,
    /// `Read_Encorder`
    pub read_encoder: ReadEncoderFn,
}
