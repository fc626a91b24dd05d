//! Encoder input

use amc_motion::{Backend, EncoderConfig};
use anyhow::Result;

use crate::commands::axis::label;
use crate::commands::{EncoderCommands, check_device};
use crate::output;

/// Execute encoder command
pub fn execute(cmd: &EncoderCommands, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;

    match cmd {
        EncoderCommands::Configure {
            target,
            mode,
            preset_8000,
            disable,
        } => {
            check_device(&controller, target.device_index())?;
            let config = EncoderConfig {
                mode: *mode,
                preset_8000: *preset_8000,
                enabled: !*disable,
            };
            controller
                .axis(target.device_index(), target.axis_id())
                .configure_encoder(&config)?;
            let state = if config.enabled { "enabled" } else { "disabled" };
            output::print_success(
                &format!("Encoder {} {state} (mode {mode})", label(*target)),
                json,
            );
        }
        EncoderCommands::Read { target } => {
            check_device(&controller, target.device_index())?;
            let count = controller
                .axis(target.device_index(), target.axis_id())
                .read_encoder()?;
            output::print_value("encoder", count, json);
        }
    }
    Ok(())
}
