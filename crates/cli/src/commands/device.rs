//! Controller enumeration and reset

use amc_motion::{Backend, DeviceIndex, DynController};
use anyhow::Result;
use tracing::info;

use crate::commands::{DeviceCommands, check_device};
use crate::output;

/// Execute device command
pub fn execute(cmd: &DeviceCommands, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;

    match cmd {
        DeviceCommands::List => list_devices(&controller, json),
        DeviceCommands::Reset { device } => reset_device(&controller, DeviceIndex(*device), json),
    }
}

fn list_devices(controller: &DynController, json: bool) -> Result<()> {
    let count = controller.device_count()?;
    let devices: Vec<DeviceIndex> = (0..count)
        .filter_map(|index| i32::try_from(index).ok().map(DeviceIndex))
        .collect();
    output::print_device_list(&devices, controller.driver_name(), json);
    Ok(())
}

fn reset_device(controller: &DynController, device: DeviceIndex, json: bool) -> Result<()> {
    check_device(controller, device)?;
    controller.reset_device(device)?;
    info!(%device, "Controller reset");
    output::print_success(&format!("Device {device} reset"), json);
    Ok(())
}
