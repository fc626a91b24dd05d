//! Controller behaviour over the simulated driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use amc_errors::{AmcError, DeviceError, ValidationError};
use amc_motion::prelude::*;
use tracing_test::traced_test;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const DEV: DeviceIndex = DeviceIndex::FIRST;

fn sim(pulses_per_poll: u32) -> (SimulatedDriver, Controller<SimulatedDriver>) {
    let handle = SimulatedDriver::new(SimConfig {
        pulses_per_poll,
        ..SimConfig::default()
    });
    (handle.clone(), Controller::new(handle))
}

#[test]
fn test_sessions_pair_open_and_close() -> TestResult {
    let (handle, controller) = sim(1000);

    let outer = controller.session()?;
    let inner = controller.session()?;
    assert_eq!(controller.session_count(), 2);
    drop(inner);
    assert!(handle.is_open());
    drop(outer);
    assert!(!handle.is_open());

    assert_eq!(handle.call_names(), ["openUSB", "closeUSB"]);
    Ok(())
}

#[test]
fn test_failed_open_does_not_count_session() {
    let (handle, controller) = sim(1000);
    handle.fail_next("openUSB", 1);

    let result = controller.session();
    assert!(matches!(
        result,
        Err(AmcError::Device(DeviceError::Status {
            call: "openUSB",
            code: 1
        }))
    ));
    assert_eq!(controller.session_count(), 0);
}

#[test]
#[traced_test]
fn test_close_failure_is_logged() -> TestResult {
    let (handle, controller) = sim(1000);
    let session = controller.session()?;
    handle.fail_next("closeUSB", 9);
    drop(session);
    assert!(logs_contain("Failed to close driver"));
    Ok(())
}

#[test]
fn test_validation_happens_before_driver() -> TestResult {
    let (handle, controller) = sim(1000);
    let _session = controller.session()?;
    handle.clear_journal();

    let axis = controller.axis(DEV, AxisId(0));
    let result = axis.jog(JogBand::Low, &JogParams::new(Direction::Positive, 500, 100));
    assert!(matches!(
        result,
        Err(AmcError::Validation(ValidationError::ConstraintViolation(_)))
    ));
    assert!(handle.call_names().is_empty());
    Ok(())
}

#[test]
fn test_wait_until_stopped_reports_final_status() -> TestResult {
    let (_, controller) = sim(5000);
    let _session = controller.session()?;
    let axis = controller.axis(DEV, AxisId(1));

    axis.move_relative(&RelativeMove::builder(Direction::Positive, 25_000).build()?)?;
    let status = axis.wait_until_stopped(Duration::ZERO, Duration::from_secs(5), || false)?;
    assert_eq!(status.position, 25_000);
    assert_eq!(status.run_state, RunState::Stopped);
    Ok(())
}

#[test]
fn test_abort_stops_axis() -> TestResult {
    let (handle, controller) = sim(10);
    let _session = controller.session()?;
    let axis = controller.axis(DEV, AxisId(0));
    axis.move_relative(&RelativeMove::builder(Direction::Positive, 1_000_000).build()?)?;

    let polls = AtomicUsize::new(0);
    let result = axis.wait_until_stopped(Duration::ZERO, Duration::from_secs(5), || {
        polls.fetch_add(1, Ordering::SeqCst) >= 2
    });

    assert!(matches!(
        result,
        Err(AmcError::Device(DeviceError::Stopped { device: 0, axis: 0 }))
    ));
    assert!(!handle.is_moving(DEV, AxisId(0))?);
    assert_eq!(handle.position(DEV, AxisId(0))?, 30);
    assert_eq!(handle.call_names().last(), Some(&"AxsStop"));
    Ok(())
}

#[test]
fn test_timeout_stops_axis() -> TestResult {
    let (handle, controller) = sim(1);
    let _session = controller.session()?;
    let axis = controller.axis(DEV, AxisId(2));
    axis.jog(JogBand::High, &JogParams::new(Direction::Negative, 10, 20))?;

    let result = axis.wait_until_stopped(Duration::from_millis(1), Duration::from_millis(20), || false);
    assert!(matches!(
        result,
        Err(AmcError::Device(DeviceError::Timeout { .. }))
    ));
    assert!(!handle.is_moving(DEV, AxisId(2))?);
    Ok(())
}

#[test]
fn test_controller_is_shareable_across_threads() -> TestResult {
    let (_, controller) = sim(1000);
    let _session = controller.session()?;

    let workers: Vec<_> = (0..4u8)
        .map(|line| {
            let controller = controller.clone();
            std::thread::spawn(move || -> Result<(), AmcError> {
                controller.set_output_bits(DEV, PortBits::line(line)?)
            })
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .map_err(|_| "worker thread panicked")??;
    }

    assert_eq!(controller.read_output_port(DEV)?, PortBits(0b0000_1111));
    Ok(())
}

#[test]
fn test_boxed_driver_through_backend() -> TestResult {
    let controller = Backend::Simulated(SimConfig::default()).controller()?;
    let _session = controller.session()?;
    assert_eq!(controller.device_count()?, 1);
    controller.axis(DEV, AxisId(3)).home(&HomingParams::new(Direction::Negative, 100))?;
    Ok(())
}
