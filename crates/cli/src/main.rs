//! amcctl - AMC1XE motion controller CLI
//!
//! Drives the controller's ports and axes directly and runs stage
//! transfers. Every command also works against the built-in simulator.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use std::path::PathBuf;

use amc_motion::{Backend, SimConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::*;

#[derive(Parser, Debug)]
#[command(name = "amcctl")]
#[command(about = "AMC1XE motion controller CLI - ports, axes and stage transfers")]
#[command(version)]
#[command(long_about = "
amcctl drives Usb_AMC1XE motion controllers through the vendor library:
digital ports, axis enable/stop/status, homing, jogging, relative moves and
the encoder input. The stage commands plan and run transfers of the sample
stage, opening the chamber valve and realigning the manipulator on the way.

Use --simulate to run any command against an in-memory controller and
--json for machine-readable output.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Vendor library to load instead of the platform default
    #[arg(long, global = true, env = "AMC_LIBRARY_PATH")]
    library: Option<PathBuf>,

    /// Use the in-memory simulator instead of hardware (wins over --library)
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Backend chosen on the command line, if any.
    fn backend_override(&self) -> Option<Backend> {
        if self.simulate {
            Some(Backend::Simulated(SimConfig::default()))
        } else {
            self.library.clone().map(|path| Backend::Usb {
                library_path: Some(path),
            })
        }
    }

    /// Backend for the direct driver commands.
    fn backend(&self) -> Backend {
        self.backend_override().unwrap_or_default()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Controller enumeration and reset
    #[command(subcommand)]
    Device(DeviceCommands),

    /// Digital input/output ports
    #[command(subcommand)]
    Port(PortCommands),

    /// Axis enable, stop and status
    #[command(subcommand)]
    Axis(AxisCommands),

    /// Search for the origin switch
    Home(HomeArgs),

    /// Move continuously until stopped
    Jog(JogArgs),

    /// Change the target speed of a running high-frequency jog
    JogSpeed(JogSpeedArgs),

    /// Profiled relative move
    Move(MoveArgs),

    /// Encoder input
    #[command(subcommand)]
    Encoder(EncoderCommands),

    /// Stage transfers
    #[command(subcommand)]
    Stage(StageCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("amcctl={log_level},amc_motion={log_level},amc_stage={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = execute_command(&cli).await;

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let exit_code = error::exit_code(&e);
            if cli.json {
                output::print_error_json(&e, exit_code);
            } else {
                output::print_error_human(&e);
            }
            std::process::exit(exit_code);
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    let json = cli.json;
    match &cli.command {
        Commands::Device(cmd) => commands::device::execute(cmd, json, &cli.backend()),
        Commands::Port(cmd) => commands::port::execute(cmd, json, &cli.backend()),
        Commands::Axis(cmd) => commands::axis::execute(cmd, json, &cli.backend()),
        Commands::Home(args) => commands::motion::home(args, json, &cli.backend()),
        Commands::Jog(args) => commands::motion::jog(args, json, &cli.backend()),
        Commands::JogSpeed(args) => commands::motion::jog_speed(args, json, &cli.backend()),
        Commands::Move(args) => commands::motion::relative_move(args, json, &cli.backend()).await,
        Commands::Encoder(cmd) => commands::encoder::execute(cmd, json, &cli.backend()),
        Commands::Stage(cmd) => {
            commands::stage::execute(cmd, json, cli.backend_override().as_ref()).await
        }
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_motion::{Direction, PortBits};
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // --- Global flag parsing ---

    #[test]
    fn parse_device_list_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["amcctl", "device", "list"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.simulate);
        assert!(matches!(cli.command, Commands::Device(DeviceCommands::List)));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["amcctl", "device", "list", "--json", "--simulate", "-vv"])?;
        assert!(cli.json);
        assert!(cli.simulate);
        assert_eq!(cli.verbose, 2);
        Ok(())
    }

    #[test]
    fn parse_library_selects_usb_backend() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl",
            "--library",
            "/opt/amc/libUsb_AMC1XE.so",
            "device",
            "list",
        ])?;
        assert_eq!(
            cli.backend(),
            Backend::Usb {
                library_path: Some(PathBuf::from("/opt/amc/libUsb_AMC1XE.so"))
            }
        );
        Ok(())
    }

    #[test]
    fn parse_simulate_selects_simulator() -> TestResult {
        let cli = Cli::try_parse_from(["amcctl", "--simulate", "device", "list"])?;
        assert!(matches!(cli.backend(), Backend::Simulated(_)));
        Ok(())
    }

    // --- Port and axis parsing ---

    #[test]
    fn parse_port_write_bits() -> TestResult {
        let cli = Cli::try_parse_from(["amcctl", "port", "write", "0b1010", "--device", "1"])?;
        match &cli.command {
            Commands::Port(PortCommands::Write { bits, device }) => {
                assert_eq!(*bits, PortBits(0b1010));
                assert_eq!(*device, 1);
            }
            _ => return Err("expected Port Write command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_axis_status_target() -> TestResult {
        let cli = Cli::try_parse_from(["amcctl", "axis", "status", "-d", "1", "-a", "3"])?;
        match &cli.command {
            Commands::Axis(AxisCommands::Status { target }) => {
                assert_eq!(*target, AxisTarget { device: 1, axis: 3 });
            }
            _ => return Err("expected Axis Status command".into()),
        }
        Ok(())
    }

    // --- Motion parsing ---

    #[test]
    fn parse_move_defaults() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl",
            "move",
            "--direction",
            "negative",
            "--length",
            "12500",
        ])?;
        match &cli.command {
            Commands::Move(args) => {
                assert_eq!(args.direction, Direction::Negative);
                assert_eq!(args.length, 12500);
                assert_eq!(args.start_speed, 1000);
                assert_eq!(args.target_speed, 40000);
                assert_eq!((args.acc_time, args.dec_time), (100, 100));
                assert!(!args.wait);
            }
            _ => return Err("expected Move command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_jog_high() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl",
            "jog",
            "--direction",
            "1",
            "--target-speed",
            "8000",
            "--high",
        ])?;
        match &cli.command {
            Commands::Jog(args) => {
                assert!(args.high);
                assert_eq!(args.direction, Direction::Positive);
                assert_eq!(args.start_speed, 0);
            }
            _ => return Err("expected Jog command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_encoder_configure() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl",
            "encoder",
            "configure",
            "--mode",
            "2",
            "--preset-8000",
        ])?;
        match &cli.command {
            Commands::Encoder(EncoderCommands::Configure {
                mode,
                preset_8000,
                disable,
                ..
            }) => {
                assert_eq!(*mode, 2);
                assert!(*preset_8000);
                assert!(!*disable);
            }
            _ => return Err("expected Encoder Configure command".into()),
        }
        Ok(())
    }

    // --- Stage parsing ---

    #[test]
    fn parse_stage_goto_with_offsets() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl", "stage", "goto", "52", "--from", "610", "--x", "-3", "--y", "7",
        ])?;
        match &cli.command {
            Commands::Stage(StageCommands::Goto(args)) => {
                let request = args.request();
                assert_eq!(request.x, Some(-3));
                assert_eq!(request.y, Some(7));
                assert_eq!(request.rotary_deg, None);
                let state = args.start_state();
                assert_eq!(state.rotary_deg, 5);
                assert_eq!(state.valve, amc_stage::ValveState::Closed);
            }
            _ => return Err("expected Stage Goto command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_stage_plan_with_valve() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl", "stage", "plan", "610", "--from", "52", "--valve", "open",
        ])?;
        match &cli.command {
            Commands::Stage(StageCommands::Plan(args)) => {
                assert_eq!(args.valve, ValveArg::Open);
                assert!(args.config.is_none());
            }
            _ => return Err("expected Stage Plan command".into()),
        }
        Ok(())
    }

    // --- Rejection / error cases ---

    #[test]
    fn reject_no_subcommand() {
        assert!(Cli::try_parse_from(["amcctl"]).is_err());
    }

    #[test]
    fn reject_bad_direction() {
        let result = Cli::try_parse_from(["amcctl", "home", "--direction", "up", "--speed", "10"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_bad_port_bits() {
        assert!(Cli::try_parse_from(["amcctl", "port", "set", "0x1ff"]).is_err());
    }

    #[test]
    fn reject_goto_without_from() {
        assert!(Cli::try_parse_from(["amcctl", "stage", "goto", "52"]).is_err());
    }

    #[test]
    fn parse_simulate_wins_over_library() -> TestResult {
        let cli = Cli::try_parse_from([
            "amcctl",
            "--simulate",
            "--library",
            "x.so",
            "device",
            "list",
        ])?;
        assert!(matches!(cli.backend(), Backend::Simulated(_)));
        Ok(())
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
