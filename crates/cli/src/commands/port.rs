//! Digital port access

use amc_motion::{Backend, DeviceIndex, DynController};
use anyhow::Result;

use crate::commands::{PortCommands, check_device};
use crate::output;

/// Execute port command
pub fn execute(cmd: &PortCommands, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;

    match cmd {
        PortCommands::ReadIn { device } => {
            let device = DeviceIndex(*device);
            check_device(&controller, device)?;
            let bits = controller.read_input_port(device)?;
            output::print_port("input", device, bits, json);
        }
        PortCommands::ReadOut { device } => {
            let device = DeviceIndex(*device);
            check_device(&controller, device)?;
            let bits = controller.read_output_port(device)?;
            output::print_port("output", device, bits, json);
        }
        PortCommands::Write { bits, device } => {
            update(&controller, DeviceIndex(*device), json, |c, d| {
                c.write_output_port(d, *bits)
            })?;
        }
        PortCommands::Set { bits, device } => {
            update(&controller, DeviceIndex(*device), json, |c, d| {
                c.set_output_bits(d, *bits)
            })?;
        }
        PortCommands::Clear { bits, device } => {
            update(&controller, DeviceIndex(*device), json, |c, d| {
                c.clear_output_bits(d, *bits)
            })?;
        }
    }
    Ok(())
}

/// Apply a write and print the resulting output port.
fn update(
    controller: &DynController,
    device: DeviceIndex,
    json: bool,
    write: impl FnOnce(&DynController, DeviceIndex) -> amc_errors::Result<()>,
) -> Result<()> {
    check_device(controller, device)?;
    write(controller, device)?;
    let bits = controller.read_output_port(device)?;
    output::print_port("output", device, bits, json);
    Ok(())
}
