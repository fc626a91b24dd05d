//! Homing, jogging and relative moves

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use amc_motion::{
    Axis, AxisStatus, Backend, HomingParams, JogBand, JogParams, MotionDriver, OutputMode,
    RelativeMove, SpeedAdjustment, SpeedCurve,
};
use anyhow::Result;
use tracing::{info, warn};

use crate::commands::axis::label;
use crate::commands::{HomeArgs, JogArgs, JogSpeedArgs, MoveArgs, check_device};
use crate::output;

/// Start a return-to-origin search
pub fn home(args: &HomeArgs, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;
    check_device(&controller, args.target.device_index())?;

    let params = HomingParams {
        direction: args.direction,
        output_mode: OutputMode(args.output_mode),
        speed: args.speed,
    };
    controller
        .axis(args.target.device_index(), args.target.axis_id())
        .home(&params)?;
    output::print_success(
        &format!("Axis {} homing {}", label(args.target), args.direction),
        json,
    );
    Ok(())
}

/// Start a continuous move
pub fn jog(args: &JogArgs, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;
    check_device(&controller, args.target.device_index())?;

    let band = if args.high { JogBand::High } else { JogBand::Low };
    let params = JogParams {
        direction: args.direction,
        output_mode: OutputMode(args.output_mode),
        start_speed: args.start_speed,
        target_speed: args.target_speed,
    };
    controller
        .axis(args.target.device_index(), args.target.axis_id())
        .jog(band, &params)?;
    output::print_success(
        &format!(
            "Axis {} jogging {} at {}",
            label(args.target),
            args.direction,
            args.target_speed
        ),
        json,
    );
    Ok(())
}

/// Change the speed of a running high-frequency jog
pub fn jog_speed(args: &JogSpeedArgs, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;
    check_device(&controller, args.target.device_index())?;

    controller
        .axis(args.target.device_index(), args.target.axis_id())
        .adjust_jog_speed(&SpeedAdjustment {
            start_speed: args.start_speed,
            target_speed: args.target_speed,
        })?;
    output::print_success(
        &format!("Axis {} speed set to {}", label(args.target), args.target_speed),
        json,
    );
    Ok(())
}

/// Run a profiled relative move, optionally waiting for it to finish
pub async fn relative_move(args: &MoveArgs, json: bool, backend: &Backend) -> Result<()> {
    let controller = backend.controller()?;
    let _session = controller.session()?;
    check_device(&controller, args.target.device_index())?;

    let motion = RelativeMove::builder(args.direction, args.length)
        .curve(SpeedCurve(args.curve))
        .output_mode(args.output_mode())
        .speeds(args.start_speed, args.target_speed)
        .start_dec(args.start_dec)
        .ramp(args.acc_time, args.dec_time)
        .build()?;
    let axis = controller.axis(args.target.device_index(), args.target.axis_id());
    axis.move_relative(&motion)?;
    info!(axis = %label(args.target), length = args.length, "Relative move started");

    if !args.wait {
        output::print_success(
            &format!(
                "Axis {} moving {} pulses {}",
                label(args.target),
                args.length,
                args.direction
            ),
            json,
        );
        return Ok(());
    }

    let status = wait_for_stop(
        axis,
        Duration::from_millis(args.poll_ms),
        Duration::from_millis(args.timeout_ms),
    )
    .await?;
    output::print_axis_status(args.target.device_index(), args.target.axis, &status, json);
    Ok(())
}

/// Poll on a blocking thread until the axis stops; Ctrl+C stops the axis.
async fn wait_for_stop(
    axis: Axis<Box<dyn MotionDriver>>,
    poll: Duration,
    timeout: Duration,
) -> Result<AxisStatus> {
    let abort = Arc::new(AtomicBool::new(false));
    let interrupt = {
        let abort = Arc::clone(&abort);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping axis");
                abort.store(true, Ordering::SeqCst);
            }
        })
    };

    let waiter = tokio::task::spawn_blocking(move || {
        axis.wait_until_stopped(poll, timeout, || abort.load(Ordering::SeqCst))
    });
    let result = waiter.await;
    interrupt.abort();
    let status = result??;
    Ok(status)
}
