//! Stage transfers

use std::path::Path;

use amc_motion::Backend;
use amc_stage::{LoggingManipulator, Stage, StageConfig, StageError, plan};
use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::commands::{StageCommands, TransferArgs};
use crate::error::CliError;
use crate::output;

/// Execute stage command
///
/// `backend` replaces the configured backend when given on the command
/// line; `--simulate` keeps a simulated backend from the config file.
pub async fn execute(cmd: &StageCommands, json: bool, backend: Option<&Backend>) -> Result<()> {
    match cmd {
        StageCommands::Goto(args) => goto(args, json, backend).await,
        StageCommands::Plan(args) => {
            let config = load_config(args.config.as_deref(), backend).await?;
            let steps = plan(&config, &args.start_state(), &args.request())?;
            output::print_plan(&steps, json);
            Ok(())
        }
        StageCommands::Stop { config } => {
            let config = load_config(config.as_deref(), backend).await?;
            let controller = config.backend.controller()?;
            Stage::new(config, controller, LoggingManipulator).stop_axis()?;
            output::print_success("Stage axis stopped", json);
            Ok(())
        }
    }
}

async fn load_config(path: Option<&Path>, backend: Option<&Backend>) -> Result<StageConfig> {
    let mut config = match path {
        Some(path) => StageConfig::load_from_path(path).await?,
        None => StageConfig::default(),
    };
    match backend {
        Some(Backend::Simulated(_)) if matches!(config.backend, Backend::Simulated(_)) => {}
        Some(backend) => config.backend = backend.clone(),
        None => {}
    }
    config.validate()?;
    Ok(config)
}

async fn goto(args: &TransferArgs, json: bool, backend: Option<&Backend>) -> Result<()> {
    let config = load_config(args.config.as_deref(), backend).await?;
    let controller = config.backend.controller()?;
    let mut stage =
        Stage::new(config, controller, LoggingManipulator).with_state(args.start_state());
    let request = args.request();
    let stop = stage.stop_signal();

    let progress = (!json).then(|| {
        let mut events = stage.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => output::print_stage_event(&event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let result = {
        let transfer = stage.transfer(&request);
        tokio::pin!(transfer);
        tokio::select! {
            result = &mut transfer => result,
            Ok(()) = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping stage");
                stop.request();
                transfer.await
            }
        }
    };

    // Closing the event channel ends the progress task.
    drop(stage);
    if let Some(progress) = progress {
        progress.await?;
    }

    match result {
        Ok(state) => {
            output::print_stage_state(&state, json);
            Ok(())
        }
        Err(StageError::Stopped { position_mm }) => Err(CliError::TransferStopped(position_mm).into()),
        Err(e) => Err(e.into()),
    }
}
