//! Axis enable, stop and status

use amc_motion::Backend;
use anyhow::Result;

use crate::commands::{AxisCommands, AxisTarget, check_device};
use crate::output;

/// Execute axis command
pub fn execute(cmd: &AxisCommands, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;

    let target = match cmd {
        AxisCommands::Enable { target }
        | AxisCommands::Disable { target }
        | AxisCommands::Stop { target }
        | AxisCommands::Status { target }
        | AxisCommands::Speed { target } => *target,
    };
    check_device(&controller, target.device_index())?;
    let axis = controller.axis(target.device_index(), target.axis_id());

    match cmd {
        AxisCommands::Enable { .. } => {
            axis.set_enabled(true)?;
            output::print_success(&format!("Axis {} enabled", label(target)), json);
        }
        AxisCommands::Disable { .. } => {
            axis.set_enabled(false)?;
            output::print_success(&format!("Axis {} disabled", label(target)), json);
        }
        AxisCommands::Stop { .. } => {
            axis.stop()?;
            output::print_success(&format!("Axis {} stopped", label(target)), json);
        }
        AxisCommands::Status { .. } => {
            let status = axis.status()?;
            output::print_axis_status(target.device_index(), target.axis, &status, json);
        }
        AxisCommands::Speed { .. } => {
            let speed = axis.speed()?;
            output::print_value("speed", speed, json);
        }
    }
    Ok(())
}

pub fn label(target: AxisTarget) -> String {
    format!("{}/{}", target.device, target.axis)
}
