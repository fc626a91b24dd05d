//! Executing transfer plans against the controller and the manipulator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use amc_errors::{AmcError, DeviceError};
use amc_motion::{Axis, Direction, DynController, MotionDriver, RelativeMove};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::StageConfig;
use crate::error::{StageError, StageResult};
use crate::manipulator::{Manipulator, ManipulatorError, Nudge};
use crate::planner::{StageState, Step, TransferRequest, ValveState, plan};
use crate::units::{mm_to_pulses, pulses_to_mm};

/// Capacity of the event channel.
pub const EVENT_CAPACITY: usize = 256;

/// Progress and outcome notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    /// The valve changed state.
    ValveChanged {
        /// New state.
        valve: ValveState,
    },
    /// The stage came to rest at a new position.
    PositionChanged {
        /// Position.
        position_mm: f64,
    },
    /// The manipulator X offset changed by one unit.
    XChanged {
        /// New X.
        x: i32,
    },
    /// The manipulator Y offset changed by one unit.
    YChanged {
        /// New Y.
        y: i32,
    },
    /// The rotary angle changed by one step.
    RotaryChanged {
        /// New angle.
        degrees: i32,
    },
    /// A transfer completed.
    TransferFinished {
        /// Final state.
        state: StageState,
    },
    /// Motion was stopped on request.
    Stopped {
        /// Position where the stage came to rest.
        position_mm: f64,
    },
    /// A command failed.
    Failed {
        /// Error text.
        reason: String,
    },
}

/// Shared stop request flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Ask the running transfer to stop.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Forget a previous request.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Why a stage move ended before arriving.
#[derive(Debug)]
enum Halt {
    Requested,
    TimedOut,
    Failed(StageError),
}

fn arm_error(action: &'static str) -> impl FnOnce(ManipulatorError) -> StageError {
    move |e| StageError::Manipulator {
        action,
        reason: e.0,
    }
}

/// Stage, controller and manipulator under one owner.
pub struct Stage<M> {
    config: StageConfig,
    controller: DynController,
    manipulator: M,
    state: StageState,
    stop: StopSignal,
    events: broadcast::Sender<StageEvent>,
}

impl<M> std::fmt::Debug for Stage<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<M: Manipulator> Stage<M> {
    /// Stage at the default state (position 0, valve closed).
    pub fn new(config: StageConfig, controller: DynController, manipulator: M) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            controller,
            manipulator,
            state: StageState::default(),
            stop: StopSignal::default(),
            events,
        }
    }

    /// Start from a known state instead of the default.
    #[must_use]
    pub fn with_state(mut self, state: StageState) -> Self {
        self.state = state;
        self
    }

    /// Last known state.
    pub fn state(&self) -> &StageState {
        &self.state
    }

    /// Configuration in use.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Stop flag checked while a transfer runs.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Receive events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<StageEvent> {
        self.events.clone()
    }

    pub(crate) fn emit(&self, event: StageEvent) {
        debug!(?event, "Stage event");
        // No subscribers is fine.
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    fn axis(&self) -> Axis<Box<dyn MotionDriver>> {
        self.controller.axis(self.config.device, self.config.axis)
    }

    /// Plan and run a transfer.
    ///
    /// The stop signal is checked before every step and between position
    /// polls.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Stopped`] after a stop request, or the first
    /// planning, controller or manipulator failure.
    pub async fn transfer(&mut self, request: &TransferRequest) -> StageResult<StageState> {
        let steps = plan(&self.config, &self.state, request)?;
        info!(
            from_mm = self.state.position_mm,
            to_mm = request.target_mm,
            steps = steps.len(),
            "Starting transfer"
        );

        for step in steps {
            if self.stop.is_requested() {
                return Err(StageError::Stopped {
                    position_mm: self.state.position_mm,
                });
            }
            match step {
                Step::OpenValve => self.open_valve().await?,
                Step::CloseValve => self.close_valve().await?,
                Step::Move { to_mm, .. } => self.move_to(to_mm).await?,
                Step::AdjustXy { x, y } => {
                    self.adjust_x(x).await?;
                    self.adjust_y(y).await?;
                }
                Step::AdjustRotary { degrees } => self.adjust_rotary(degrees).await?,
            }
        }

        info!(position_mm = self.state.position_mm, "Transfer finished");
        Ok(self.state)
    }

    /// Run the valve-open program.
    ///
    /// # Errors
    ///
    /// Returns the manipulator failure.
    pub async fn open_valve(&mut self) -> StageResult<()> {
        self.manipulator
            .open_valve()
            .await
            .map_err(arm_error("open_valve"))?;
        self.record_valve_state(ValveState::Open);
        self.emit(StageEvent::ValveChanged {
            valve: ValveState::Open,
        });
        Ok(())
    }

    /// Run the valve-close program.
    ///
    /// # Errors
    ///
    /// Returns the manipulator failure.
    pub async fn close_valve(&mut self) -> StageResult<()> {
        self.manipulator
            .close_valve()
            .await
            .map_err(arm_error("close_valve"))?;
        self.record_valve_state(ValveState::Closed);
        self.emit(StageEvent::ValveChanged {
            valve: ValveState::Closed,
        });
        Ok(())
    }

    /// Record a valve state observed elsewhere, without running a program.
    pub fn record_valve_state(&mut self, valve: ValveState) {
        if self.state.valve != valve {
            info!(%valve, "Valve state updated");
        }
        self.state.valve = valve;
    }

    /// Stop the stage axis outside a transfer.
    ///
    /// # Errors
    ///
    /// Returns the controller failure.
    pub fn stop_axis(&self) -> StageResult<()> {
        let _session = self.controller.session()?;
        self.axis().stop()?;
        Ok(())
    }

    /// Move the stage to `to_mm` and wait until it stops.
    ///
    /// The axis is cycled disabled/enabled before the move, as the drive
    /// expects. Driver calls run inline since each returns at once; only the
    /// wait between polls yields to the runtime.
    ///
    /// Once the move is issued, any way out other than arrival (stop request,
    /// deadline, failed poll) stops the axis and records where it came to
    /// rest before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Stopped`], a timeout or a controller failure.
    pub async fn move_to(&mut self, to_mm: f64) -> StageResult<()> {
        let from_mm = self.state.position_mm;
        let pulses = mm_to_pulses((to_mm - from_mm).abs(), self.config.pulses_per_mm)?;
        if pulses == 0 {
            self.state.position_mm = to_mm;
            self.emit(StageEvent::PositionChanged { position_mm: to_mm });
            return Ok(());
        }
        let direction = Direction::toward(from_mm, to_mm);
        let motion = RelativeMove::builder(direction, pulses)
            .profile(&self.config.profile)
            .build()?;

        let _session = self.controller.session()?;
        let axis = self.axis();
        axis.set_enabled(false)?;
        axis.set_enabled(true)?;
        let start = axis.status()?.position;
        axis.move_relative(&motion)?;

        let allowed = self.config.move_deadline(pulses);
        let allowed_ms = u64::try_from(allowed.as_millis()).unwrap_or(u64::MAX);
        debug!(pulses, allowed_ms, "Stage move issued");
        let halt = match self.wait_for_arrival(&axis, allowed).await {
            Ok(()) => {
                self.state.position_mm = to_mm;
                self.emit(StageEvent::PositionChanged { position_mm: to_mm });
                return Ok(());
            }
            Err(halt) => halt,
        };

        // The settle read runs even if the stop call failed.
        let stopped = axis.stop();
        let settled = self.settle(&axis, start, direction, from_mm);
        let settled = stopped.map_err(StageError::from).and(settled);

        match halt {
            Halt::Requested => {
                let position_mm = settled?;
                warn!(position_mm, "Stage move stopped on request");
                Err(StageError::Stopped { position_mm })
            }
            Halt::TimedOut => {
                let position_mm = settled?;
                warn!(position_mm, timeout_ms = allowed_ms, "Stage move timed out");
                Err(AmcError::from(DeviceError::timeout("stage move", allowed_ms)).into())
            }
            Halt::Failed(e) => {
                match settled {
                    Ok(position_mm) => {
                        warn!(position_mm, error = %e, "Stage move aborted by a controller failure");
                    }
                    Err(cleanup) => {
                        warn!(error = %e, cleanup = %cleanup, "Stage could not be stopped after a controller failure");
                    }
                }
                Err(e)
            }
        }
    }

    /// Poll until the axis reports it has stopped.
    async fn wait_for_arrival(
        &self,
        axis: &Axis<Box<dyn MotionDriver>>,
        allowed: Duration,
    ) -> Result<(), Halt> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let deadline = Instant::now().checked_add(allowed);

        loop {
            if self.stop.is_requested() {
                return Err(Halt::Requested);
            }
            let status = axis
                .status()
                .map_err(|e| Halt::Failed(StageError::from(e)))?;
            if !status.is_moving() {
                return Ok(());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Halt::TimedOut);
            }
            ticker.tick().await;
        }
    }

    /// Work out where a stopped move left the stage.
    fn settle(
        &mut self,
        axis: &Axis<Box<dyn MotionDriver>>,
        start: u32,
        direction: Direction,
        from_mm: f64,
    ) -> StageResult<f64> {
        let now = axis.status()?.position;
        let travelled = match direction {
            Direction::Positive => now.wrapping_sub(start),
            Direction::Negative => start.wrapping_sub(now),
        };
        let delta = pulses_to_mm(travelled, self.config.pulses_per_mm);
        let position_mm = match direction {
            Direction::Positive => from_mm + delta,
            Direction::Negative => from_mm - delta,
        };
        self.state.position_mm = position_mm;
        self.emit(StageEvent::PositionChanged { position_mm });
        Ok(position_mm)
    }

    /// Step the manipulator X offset to `target`.
    ///
    /// # Errors
    ///
    /// Returns the manipulator failure.
    pub async fn adjust_x(&mut self, target: i32) -> StageResult<()> {
        if self.state.x == target {
            return Ok(());
        }
        self.manipulator.enter_x().await.map_err(arm_error("enter_x"))?;
        while let Some(nudge) = Nudge::toward(self.state.x, target) {
            self.manipulator
                .step_x(nudge)
                .await
                .map_err(arm_error("step_x"))?;
            self.state.x += nudge.delta();
            self.emit(StageEvent::XChanged { x: self.state.x });
        }
        self.manipulator.exit_x().await.map_err(arm_error("exit_x"))?;
        Ok(())
    }

    /// Step the manipulator Y offset to `target`.
    ///
    /// # Errors
    ///
    /// Returns the manipulator failure.
    pub async fn adjust_y(&mut self, target: i32) -> StageResult<()> {
        if self.state.y == target {
            return Ok(());
        }
        self.manipulator.enter_y().await.map_err(arm_error("enter_y"))?;
        while let Some(nudge) = Nudge::toward(self.state.y, target) {
            self.manipulator
                .step_y(nudge)
                .await
                .map_err(arm_error("step_y"))?;
            self.state.y += nudge.delta();
            self.emit(StageEvent::YChanged { y: self.state.y });
        }
        self.manipulator.exit_y().await.map_err(arm_error("exit_y"))?;
        Ok(())
    }

    /// Rotate to `degrees` in whole steps.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unreachable angle, or the
    /// manipulator failure.
    pub async fn adjust_rotary(&mut self, degrees: i32) -> StageResult<()> {
        self.config
            .rotary
            .check_reachable(self.state.rotary_deg, degrees)?;
        if self.state.rotary_deg == degrees {
            return Ok(());
        }
        let step = self.config.rotary.step_deg;
        self.manipulator
            .enter_rotary()
            .await
            .map_err(arm_error("enter_rotary"))?;
        while self.state.rotary_deg != degrees {
            if self.state.rotary_deg < degrees {
                self.manipulator
                    .rotate_forward()
                    .await
                    .map_err(arm_error("rotate_forward"))?;
                self.state.rotary_deg += step;
            } else {
                self.manipulator
                    .rotate_back()
                    .await
                    .map_err(arm_error("rotate_back"))?;
                self.state.rotary_deg -= step;
            }
            self.emit(StageEvent::RotaryChanged {
                degrees: self.state.rotary_deg,
            });
        }
        self.manipulator
            .exit_rotary()
            .await
            .map_err(arm_error("exit_rotary"))?;
        Ok(())
    }
}
