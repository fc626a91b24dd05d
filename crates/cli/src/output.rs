//! Output formatting for CLI responses

use amc_motion::{AxisStatus, DeviceIndex, PortBits, RunState};
use amc_stage::{StageEvent, StageState, Step};
use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::json;

use crate::error::toolkit_error;

/// Print `{"success": true, <key>: value}`.
fn print_json<T: Serialize + ?Sized>(key: &str, value: &T) {
    let output = serde_json::to_value(value).and_then(|value| {
        let mut object = serde_json::Map::new();
        object.insert("success".to_string(), true.into());
        object.insert(key.to_string(), value);
        serde_json::to_string_pretty(&object)
    });
    match output {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {key} as JSON: {e}"),
    }
}

/// JSON body for a failed command.
///
/// Toolkit errors also carry their category, severity and whether a retry
/// may succeed.
fn error_json(error: &Error, code: i32) -> serde_json::Value {
    let mut body = json!({
        "message": error.to_string(),
        "code": code,
    });
    if let (Some(inner), Some(fields)) = (toolkit_error(error), body.as_object_mut()) {
        fields.insert("category".to_string(), inner.category().as_str().into());
        fields.insert("severity".to_string(), inner.severity().to_string().into());
        fields.insert("retryable".to_string(), inner.is_retryable().into());
    }
    json!({ "success": false, "error": body })
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, code: i32) {
    match serde_json::to_string_pretty(&error_json(error, code)) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }

    if toolkit_error(error).is_some_and(|e| e.is_retryable()) {
        eprintln!("  {} the command may succeed if run again", "Hint:".cyan());
    }
}

/// Print the enumerated controllers
pub fn print_device_list(devices: &[DeviceIndex], driver: &str, json: bool) {
    if json {
        let output = json!({
            "success": true,
            "driver": driver,
            "devices": devices,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to format device list as JSON: {e}"),
        }
        return;
    }

    if devices.is_empty() {
        println!("{}", "No controllers found".yellow());
        return;
    }
    println!("{} ({})", "Controllers:".bold(), driver.dimmed());
    for device in devices {
        println!("  {} device {}", "●".green(), device.to_string().bold());
    }
}

/// Print one port byte
pub fn print_port(name: &str, device: DeviceIndex, bits: PortBits, json: bool) {
    if json {
        print_json(
            "port",
            &json!({ "device": device, "name": name, "value": bits.raw() }),
        );
        return;
    }

    let lines: String = (0..8u8)
        .rev()
        .map(|line| if bits.is_set(line) { '1' } else { '0' })
        .collect();
    println!("{} {} {}", format!("{name} port").bold(), bits, lines.dimmed());
}

/// Print an axis snapshot
pub fn print_axis_status(device: DeviceIndex, axis: u32, status: &AxisStatus, json: bool) {
    if json {
        print_json(
            "status",
            &json!({ "device": device, "axis": axis, "axis_status": status }),
        );
        return;
    }

    let state = match status.run_state {
        RunState::Stopped => "stopped".green(),
        RunState::Running(code) => format!("running ({code})").yellow(),
    };
    println!("{} {}/{}", "Axis".bold(), device, axis);
    println!("  Position: {} pulses", status.position);
    println!("  State: {state}");
    println!("  IO: {:#010b}", status.io_state);
    println!("  Sync IO: {:#010b}", status.sync_io);
}

/// Print a single labelled value
pub fn print_value(label: &str, value: u32, json: bool) {
    if json {
        print_json(label, &value);
    } else {
        println!("{} {}", format!("{label}:").bold(), value);
    }
}

/// Print a planned transfer
pub fn print_plan(steps: &[Step], json: bool) {
    if json {
        print_json("steps", steps);
        return;
    }

    if steps.is_empty() {
        println!("{}", "Already in place, nothing to do".yellow());
        return;
    }
    println!("{}", "Transfer plan:".bold());
    for (i, step) in steps.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, describe_step(step));
    }
}

fn describe_step(step: &Step) -> String {
    match step {
        Step::OpenValve => "open valve".to_string(),
        Step::CloseValve => "close valve".to_string(),
        Step::Move { from_mm, to_mm } => format!("move {from_mm} mm -> {to_mm} mm"),
        Step::AdjustXy { x, y } => format!("set x={x} y={y}"),
        Step::AdjustRotary { degrees } => format!("rotate to {degrees}°"),
    }
}

/// Print a progress event while a transfer runs (human mode only)
pub fn print_stage_event(event: &StageEvent) {
    match event {
        StageEvent::ValveChanged { valve } => println!("  valve {}", valve.to_string().cyan()),
        StageEvent::PositionChanged { position_mm } => {
            println!("  at {} mm", format!("{position_mm:.3}").cyan());
        }
        StageEvent::XChanged { x } => println!("  x = {x}"),
        StageEvent::YChanged { y } => println!("  y = {y}"),
        StageEvent::RotaryChanged { degrees } => println!("  rotary = {degrees}°"),
        StageEvent::TransferFinished { .. }
        | StageEvent::Stopped { .. }
        | StageEvent::Failed { .. } => {}
    }
}

/// Print the stage state after a transfer
pub fn print_stage_state(state: &StageState, json: bool) {
    if json {
        print_json("state", state);
        return;
    }

    println!("{}", "Stage:".bold());
    println!("  Position: {:.3} mm", state.position_mm);
    println!("  Valve: {}", state.valve);
    println!("  X/Y: {}/{}", state.x, state.y);
    println!("  Rotary: {}°", state.rotary_deg);
}

/// Print success message
pub fn print_success(message: &str, json: bool) {
    if json {
        print_json("message", message);
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_steps() {
        assert_eq!(describe_step(&Step::OpenValve), "open valve");
        assert_eq!(
            describe_step(&Step::Move {
                from_mm: 610.0,
                to_mm: 120.0
            }),
            "move 610 mm -> 120 mm"
        );
        assert_eq!(describe_step(&Step::AdjustXy { x: -8, y: 10 }), "set x=-8 y=10");
    }

    #[test]
    fn test_error_json_classifies_driver_errors() {
        let error = Error::from(amc_errors::AmcError::from(
            amc_errors::DeviceError::status("DeltMov", 3),
        ));
        let body = error_json(&error, 5);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], 5);
        assert_eq!(body["error"]["category"], "rejected");
        assert_eq!(body["error"]["severity"], "ERROR");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[test]
    fn test_error_json_without_toolkit_error() {
        let body = error_json(&anyhow::anyhow!("plain failure"), 1);
        assert_eq!(body["error"]["message"], "plain failure");
        assert!(body["error"].get("category").is_none());
    }
}
