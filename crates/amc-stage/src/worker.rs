//! Background task that owns a [`Stage`] and serves commands.
//!
//! Commands arrive on an mpsc channel and are handled one at a time. While a
//! transfer runs the worker keeps reading the channel: `Stop` interrupts the
//! transfer, `Shutdown` interrupts it and ends the task, anything else waits
//! until the transfer is over.

use std::collections::VecDeque;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{StageError, StageResult};
use crate::manipulator::Manipulator;
use crate::planner::{StageState, TransferRequest, ValveState};
use crate::stage::{Stage, StageEvent};

/// Capacity of the command channel.
pub const COMMAND_CAPACITY: usize = 32;

/// Requests served by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum StageCommand {
    /// Plan and run a transfer.
    Transfer(TransferRequest),
    /// Stop the running transfer, or the axis if none runs.
    Stop,
    /// Run the valve-open program.
    OpenValve,
    /// Run the valve-close program.
    CloseValve,
    /// Record the valve state without running a program.
    SetValveState(ValveState),
    /// End the worker.
    Shutdown,
}

/// Client side of a running worker.
#[derive(Debug)]
pub struct StageHandle {
    commands: mpsc::Sender<StageCommand>,
    events: broadcast::Sender<StageEvent>,
    task: JoinHandle<StageState>,
}

impl StageHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::WorkerGone`] if the worker has exited.
    pub async fn send(&self, command: StageCommand) -> StageResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_closed| StageError::WorkerGone)
    }

    /// Queue a transfer.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::WorkerGone`] if the worker has exited.
    pub async fn transfer(&self, request: TransferRequest) -> StageResult<()> {
        self.send(StageCommand::Transfer(request)).await
    }

    /// Request a stop.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::WorkerGone`] if the worker has exited.
    pub async fn stop(&self) -> StageResult<()> {
        self.send(StageCommand::Stop).await
    }

    /// Receive events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.events.subscribe()
    }

    /// Ask the worker to exit and wait for its final state.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::WorkerGone`] if the task panicked or was
    /// cancelled.
    pub async fn shutdown(self) -> StageResult<StageState> {
        if self.commands.send(StageCommand::Shutdown).await.is_err() {
            warn!("Stage worker already stopped");
        }
        self.task.await.map_err(|e| {
            error!(error = %e, "Stage worker task failed");
            StageError::WorkerGone
        })
    }
}

/// Start the worker on the current tokio runtime.
pub fn spawn<M: Manipulator + Sync + 'static>(stage: Stage<M>) -> StageHandle {
    let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
    let events = stage.event_sender();
    let task = tokio::spawn(run(stage, rx));
    StageHandle {
        commands,
        events,
        task,
    }
}

async fn run<M: Manipulator>(
    mut stage: Stage<M>,
    mut rx: mpsc::Receiver<StageCommand>,
) -> StageState {
    info!("Stage worker started");
    let mut pending = VecDeque::new();
    let mut closed = false;

    loop {
        let command = match pending.pop_front() {
            Some(command) => command,
            None if closed => break,
            None => match rx.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            StageCommand::Transfer(request) => {
                let stop = stage.stop_signal();
                stop.clear();
                let mut shutdown = false;
                let result = {
                    let transfer = stage.transfer(&request);
                    tokio::pin!(transfer);
                    loop {
                        tokio::select! {
                            result = &mut transfer => break result,
                            command = rx.recv(), if !closed => match command {
                                Some(StageCommand::Stop) => {
                                    info!("Stop requested during transfer");
                                    stop.request();
                                }
                                Some(StageCommand::Shutdown) => {
                                    stop.request();
                                    shutdown = true;
                                }
                                Some(other) => pending.push_back(other),
                                None => closed = true,
                            },
                        }
                    }
                };
                report(&stage, result);
                if shutdown {
                    break;
                }
            }
            StageCommand::Stop => match stage.stop_axis() {
                Ok(()) => stage.emit(StageEvent::Stopped {
                    position_mm: stage.state().position_mm,
                }),
                Err(e) => fail(&stage, &e),
            },
            StageCommand::OpenValve => {
                if let Err(e) = stage.open_valve().await {
                    fail(&stage, &e);
                }
            }
            StageCommand::CloseValve => {
                if let Err(e) = stage.close_valve().await {
                    fail(&stage, &e);
                }
            }
            StageCommand::SetValveState(valve) => stage.record_valve_state(valve),
            StageCommand::Shutdown => break,
        }
    }

    info!(state = ?stage.state(), "Stage worker stopped");
    *stage.state()
}

fn report<M: Manipulator>(stage: &Stage<M>, result: StageResult<StageState>) {
    match result {
        Ok(state) => stage.emit(StageEvent::TransferFinished { state }),
        Err(StageError::Stopped { position_mm }) => {
            stage.emit(StageEvent::Stopped { position_mm });
        }
        Err(e) => fail(stage, &e),
    }
}

fn fail<M: Manipulator>(stage: &Stage<M>, e: &StageError) {
    error!(error = %e, "Stage command failed");
    stage.emit(StageEvent::Failed {
        reason: e.to_string(),
    });
}
