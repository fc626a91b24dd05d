//! End-to-end transfers over the simulated controller.

use std::time::Duration;

use amc_motion::{
    AxisId, Controller, DeviceIndex, MotionDriver, MotionProfile, SimConfig, SimulatedDriver,
};
use amc_stage::{
    ManipulatorAction, Nudge, RecordingManipulator, Stage, StageCommand, StageConfig, StageError,
    StageEvent, StageState, TransferRequest, ValveState,
};
use tokio::sync::broadcast;
use tracing_test::traced_test;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Rig {
    sim: SimulatedDriver,
    arm: RecordingManipulator,
    stage: Stage<RecordingManipulator>,
}

fn rig(pulses_per_poll: u32, config: StageConfig, state: StageState) -> Rig {
    let sim = SimulatedDriver::new(SimConfig {
        pulses_per_poll,
        ..SimConfig::default()
    });
    let driver: Box<dyn MotionDriver> = Box::new(sim.clone());
    let arm = RecordingManipulator::new();
    let stage = Stage::new(config, Controller::new(driver), arm.clone()).with_state(state);
    Rig { sim, arm, stage }
}

fn fast_config() -> StageConfig {
    StageConfig {
        poll_interval_ms: 1,
        ..StageConfig::default()
    }
}

/// Config whose move deadline is little more than `margin_ms`.
fn tight_deadline_config(margin_ms: u64) -> StageConfig {
    StageConfig {
        poll_interval_ms: 1,
        move_timeout_ms: margin_ms,
        profile: MotionProfile {
            target_speed: u32::MAX,
            acc_time: 0,
            dec_time: 0,
            ..MotionProfile::default()
        },
        ..StageConfig::default()
    }
}

async fn next_outcome(
    rx: &mut broadcast::Receiver<StageEvent>,
) -> Result<StageEvent, Box<dyn std::error::Error>> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await??;
        if matches!(
            event,
            StageEvent::TransferFinished { .. } | StageEvent::Stopped { .. } | StageEvent::Failed { .. }
        ) {
            return Ok(event);
        }
    }
}

#[tokio::test]
async fn test_descending_transfer_opens_valve_and_realigns() -> TestResult {
    let start = StageState {
        position_mm: 610.0,
        valve: ValveState::Closed,
        x: -2,
        y: 6,
        rotary_deg: 5,
    };
    let Rig { sim, arm, stage } = rig(1_000_000, fast_config(), start);
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.transfer(TransferRequest::to(52.0)).await?;
    let outcome = next_outcome(&mut events).await?;

    let StageEvent::TransferFinished { state } = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert!((state.position_mm - 52.0).abs() < 1e-9);
    assert_eq!(state.valve, ValveState::Open);
    assert_eq!((state.x, state.y), (-8, 10));

    let actions = arm.actions();
    assert_eq!(actions.first(), Some(&ManipulatorAction::OpenValve));
    assert_eq!(
        actions
            .iter()
            .filter(|a| **a == ManipulatorAction::StepX(Nudge::Back))
            .count(),
        6
    );
    assert_eq!(
        actions
            .iter()
            .filter(|a| **a == ManipulatorAction::StepY(Nudge::Forward))
            .count(),
        4
    );
    assert_eq!(actions.last(), Some(&ManipulatorAction::ExitY));

    let calls = sim.call_names();
    assert_eq!(calls.iter().filter(|c| **c == "DeltMov").count(), 2);
    assert_eq!(calls.last(), Some(&"closeUSB"));
    assert!(!sim.is_open());

    let final_state = handle.shutdown().await?;
    assert_eq!(final_state, state);
    Ok(())
}

#[tokio::test]
async fn test_stop_aborts_running_move() -> TestResult {
    let config = StageConfig {
        poll_interval_ms: 2,
        ..StageConfig::default()
    };
    let start = StageState {
        position_mm: 130.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let Rig { sim, stage, .. } = rig(1000, config, start);
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.transfer(TransferRequest::to(300.0)).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop().await?;

    let outcome = next_outcome(&mut events).await?;
    let StageEvent::Stopped { position_mm } = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert!(position_mm > 130.0 && position_mm < 300.0);
    assert!(!sim.is_moving(DeviceIndex::FIRST, AxisId(0))?);
    assert!(sim.call_names().contains(&"AxsStop"));

    let state = handle.shutdown().await?;
    assert!((state.position_mm - position_mm).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_timeout_reports_failure() -> TestResult {
    let config = tight_deadline_config(20);
    let start = StageState {
        position_mm: 130.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let Rig { sim, stage, .. } = rig(1, config, start);
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.transfer(TransferRequest::to(300.0)).await?;
    let outcome = next_outcome(&mut events).await?;
    let StageEvent::Failed { reason } = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert!(reason.contains("timed out"), "{reason}");
    assert!(!sim.is_moving(DeviceIndex::FIRST, AxisId(0))?);
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_failed_poll_stops_axis_and_records_position() -> TestResult {
    let config = StageConfig {
        poll_interval_ms: 2,
        ..StageConfig::default()
    };
    let start = StageState {
        position_mm: 130.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let Rig { sim, stage, .. } = rig(1000, config, start);
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.transfer(TransferRequest::to(300.0)).await?;
    tokio::time::sleep(Duration::from_millis(30)).await;
    sim.fail_next("Read_Position", 9);

    let outcome = next_outcome(&mut events).await?;
    let StageEvent::Failed { reason } = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert!(reason.contains("Read_Position"), "{reason}");
    assert!(!sim.is_moving(DeviceIndex::FIRST, AxisId(0))?);
    assert!(sim.call_names().contains(&"AxsStop"));
    assert!(!sim.is_open());

    let state = handle.shutdown().await?;
    assert!(state.position_mm > 130.0 && state.position_mm < 300.0);
    Ok(())
}

#[tokio::test]
async fn test_driver_failure_is_reported() -> TestResult {
    let Rig { sim, stage, .. } = rig(1_000_000, fast_config(), StageState::default());
    sim.fail_next("DeltMov", 4);
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.transfer(TransferRequest::to(52.0)).await?;
    let outcome = next_outcome(&mut events).await?;
    let StageEvent::Failed { reason } = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert!(reason.contains("DeltMov"), "{reason}");
    assert!(!sim.is_open());
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_valve_commands() -> TestResult {
    let Rig { arm, stage, .. } = rig(1000, fast_config(), StageState::default());
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.send(StageCommand::OpenValve).await?;
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(
        event,
        StageEvent::ValveChanged {
            valve: ValveState::Open
        }
    );

    handle
        .send(StageCommand::SetValveState(ValveState::Closed))
        .await?;
    let state = handle.shutdown().await?;
    assert_eq!(state.valve, ValveState::Closed);
    assert_eq!(arm.actions(), vec![ManipulatorAction::OpenValve]);
    Ok(())
}

#[tokio::test]
async fn test_stop_outside_transfer_stops_axis() -> TestResult {
    let Rig { sim, stage, .. } = rig(1000, fast_config(), StageState::default());
    let handle = amc_stage::spawn(stage);
    let mut events = handle.subscribe();

    handle.stop().await?;
    let outcome = next_outcome(&mut events).await?;
    assert!(matches!(outcome, StageEvent::Stopped { .. }));
    assert_eq!(sim.call_names(), ["openUSB", "AxsStop", "closeUSB"]);
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_direct_timeout_is_logged() -> TestResult {
    let config = tight_deadline_config(10);
    let start = StageState {
        position_mm: 130.0,
        ..StageState::default()
    };
    let Rig { mut stage, .. } = rig(1, config, start);

    let result = stage.transfer(&TransferRequest::to(300.0)).await;
    assert!(matches!(result, Err(StageError::Motion(_))));
    assert!(logs_contain("Stage move timed out"));
    assert!(stage.state().position_mm < 300.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_default_config_reaches_far_stations() -> TestResult {
    let start = StageState {
        position_mm: 120.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let pulses_per_poll = SimConfig::default().pulses_per_poll;
    let Rig { sim, mut stage, .. } = rig(pulses_per_poll, StageConfig::default(), start);

    let state = stage.transfer(&TransferRequest::to(610.0)).await?;
    assert!((state.position_mm - 610.0).abs() < 1e-9);

    let state = stage.transfer(&TransferRequest::to(5362.0)).await?;
    assert!((state.position_mm - 5362.0).abs() < 1e-9);
    assert!(!sim.call_names().contains(&"AxsStop"));
    Ok(())
}

#[tokio::test]
async fn test_rotary_station_turns_sample() -> TestResult {
    let start = StageState {
        position_mm: 610.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let Rig { arm, mut stage, .. } = rig(1_000_000, fast_config(), start);
    let mut events = stage.subscribe();

    let request = TransferRequest {
        rotary_deg: Some(135),
        ..TransferRequest::to(536.0)
    };
    let state = stage.transfer(&request).await?;
    assert!((state.position_mm - 536.0).abs() < 1e-9);
    assert_eq!(state.rotary_deg, 135);
    assert_eq!(
        arm.actions(),
        vec![
            ManipulatorAction::EnterRotary,
            ManipulatorAction::RotateForward,
            ManipulatorAction::ExitRotary,
        ]
    );

    let mut rotated = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StageEvent::RotaryChanged { degrees } = event {
            rotated.push(degrees);
        }
    }
    assert_eq!(rotated, [135]);

    let request = TransferRequest {
        rotary_deg: Some(5),
        ..TransferRequest::to(536.0)
    };
    let state = stage.transfer(&request).await?;
    assert_eq!(state.rotary_deg, 5);
    assert_eq!(arm.actions().get(4), Some(&ManipulatorAction::RotateBack));
    Ok(())
}

#[tokio::test]
async fn test_sub_pulse_move_reports_position() -> TestResult {
    let start = StageState {
        position_mm: 200.0,
        ..StageState::default()
    };
    let Rig { sim, mut stage, .. } = rig(1000, fast_config(), start);
    let mut events = stage.subscribe();

    stage.move_to(200.000_01).await?;
    assert_eq!(
        events.try_recv()?,
        StageEvent::PositionChanged {
            position_mm: 200.000_01
        }
    );
    assert!(sim.call_names().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_manipulator_failure_keeps_partial_state() -> TestResult {
    let start = StageState {
        position_mm: 610.0,
        x: -2,
        y: 6,
        ..StageState::default()
    };
    let Rig { arm, mut stage, .. } = rig(1_000_000, fast_config(), start);
    arm.fail_on(ManipulatorAction::EnterY);

    let result = stage.transfer(&TransferRequest::to(52.0)).await;
    assert!(matches!(
        result,
        Err(StageError::Manipulator {
            action: "enter_y",
            ..
        })
    ));
    let state = stage.state();
    assert!((state.position_mm - 120.0).abs() < 1e-9);
    assert_eq!(state.valve, ValveState::Open);
    assert_eq!(state.x, -8);
    assert_eq!(state.y, 6);
    Ok(())
}
