//! Camera rig control CLI
//!
//! Connects to the robot over SSH for each invocation. Provides:
//! - Motor moves (relative steps, absolute angles, home)
//! - Driver initialization and status
//! - Hardware registry listing and simulation-mode updates
//! - Local config management

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use rigctl_core::config::{Config, Directories};
use rigctl_core::{Direction, Motor, MoveOutcome, Rig, SshSession, parse_angle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Camera rig control CLI
#[derive(Parser)]
#[command(name = "rigctl")]
#[command(about = "Remote pan/tilt camera rig control")]
#[command(version)]
#[command(after_help = "\
Examples:
  rigctl --host 192.168.1.20 status        Show driver status and motor angles
  rigctl move horizontal left              Pan left by the configured step
  rigctl move vertical up --degrees 25     Tilt up by 25 degrees
  rigctl angle vertical 45                 Move the tilt motor to 45 degrees
  rigctl nudge right                       Pan the camera right
  rigctl home                              Send both motors to the home angle
  rigctl hw list                           List hardware devices and modes
  rigctl hw toggle LIDAR                   Flip a device between sim and real
  rigctl config init                       Write a default config file

Password auth reads the password from $RIGCTL_PASSWORD (see connection.auth.passwordEnv).
")]
struct Cli {
    /// Config file (default: ~/.config/rigctl/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Robot host, overrides connection.host
    #[arg(long, global = true)]
    host: Option<String>,

    /// SSH user, overrides connection.username
    #[arg(long, short = 'u', global = true)]
    user: Option<String>,

    /// SSH port, overrides connection.port
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the motor driver
    Init,

    /// Show driver status, motor angles and device count
    Status,

    /// Print the current angle of a motor
    Position {
        /// horizontal (pan) or vertical (tilt)
        motor: Motor,
    },

    /// Move a motor: up, down, left, right, home, or an absolute angle
    Move {
        /// horizontal (pan) or vertical (tilt)
        motor: Motor,

        #[arg(allow_hyphen_values = true)]
        direction: Direction,

        /// Step size for relative moves (default: motion.stepDegrees)
        #[arg(long, short)]
        degrees: Option<f64>,
    },

    /// Move a motor to an absolute angle (clamped to 0-180)
    Angle {
        /// horizontal (pan) or vertical (tilt)
        motor: Motor,

        #[arg(allow_hyphen_values = true)]
        angle: String,
    },

    /// Move the camera: up/down tilt, left/right pan, home both
    Nudge {
        direction: Direction,

        /// Step size (default: motion.stepDegrees)
        #[arg(long, short)]
        degrees: Option<f64>,
    },

    /// Send both motors to the home angle
    Home,

    /// Hardware registry commands
    Hw {
        #[command(subcommand)]
        command: HwCommand,
    },

    /// Local config commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum HwCommand {
    /// List devices and their simulation mode
    List,

    /// Set a device's simulation mode and save the registry
    Set {
        /// Device name (hw_name)
        name: String,

        /// on/true for simulation, off/false for real hardware
        #[arg(value_parser = parse_flag, action = ArgAction::Set)]
        simulation: bool,
    },

    /// Flip a device between simulation and real hardware
    Toggle {
        /// Device name (hw_name)
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective config
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "sim" | "1" => Ok(true),
        "off" | "false" | "real" | "0" => Ok(false),
        other => Err(format!("expected on/off or true/false, got '{other}'")),
    }
}

fn setup_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rigctl={default_level}")));

    let Some(path) = log_file else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose > 0);
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 0);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = setup_logging(cli.verbose, cli.log_file.as_deref())?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Directories::new()?.config_file,
    };
    let config = load_config(&cli, &config_path)?;

    match cli.command {
        Commands::Config { command } => run_config_command(command, &config, &config_path),
        command => {
            let mut rig = connect(&config).await?;
            let result = run_rig_command(&mut rig, command).await;
            if let Err(e) = rig.disconnect().await {
                warn!("Disconnect failed: {e}");
            }
            result
        }
    }
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(host) = &cli.host {
        config.connection.host = Some(host.clone());
    }
    if let Some(user) = &cli.user {
        config.connection.username.clone_from(user);
    }
    if let Some(port) = cli.port {
        config.connection.port = port;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn connect(config: &Config) -> Result<Rig<SshSession>> {
    let Some(host) = config.connection.host.as_deref() else {
        bail!("No robot host configured.\nPass --host or set connection.host in the config file");
    };

    info!("Connecting to {}@{host}", config.connection.username);
    Rig::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {host}"))
}

async fn run_rig_command(rig: &mut Rig<SshSession>, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            rig.initialize()
                .await
                .context("Driver initialization failed")?;
            println!("Driver initialized");
        }
        Commands::Status => run_status(rig).await?,
        Commands::Position { motor } => {
            let angle = rig.query_position(motor).await?;
            println!("{motor}: {angle}");
        }
        Commands::Move {
            motor,
            direction,
            degrees,
        } => {
            let outcome = rig.move_motor(motor, direction, degrees).await?;
            print_outcome(&outcome);
        }
        Commands::Angle { motor, angle } => {
            let angle = parse_angle(&angle).context("Invalid Angle Provided!")?;
            let outcome = rig
                .move_motor(motor, Direction::Custom(angle), None)
                .await?;
            print_outcome(&outcome);
        }
        Commands::Nudge { direction, degrees } => {
            for outcome in rig.nudge(direction, degrees).await? {
                print_outcome(&outcome);
            }
        }
        Commands::Home => {
            for outcome in rig.home().await? {
                print_outcome(&outcome);
            }
        }
        Commands::Hw { command } => run_hw_command(rig, command).await?,
        Commands::Config { .. } => bail!("config commands do not need a connection"),
    }
    Ok(())
}

async fn run_status(rig: &Rig<SshSession>) -> Result<()> {
    println!("Host: {}", rig.session().inner().endpoint());

    match rig.driver_status().await {
        Ok(ready) => println!("Driver ready: {}", if ready { "yes" } else { "no" }),
        Err(e) => println!("Driver ready: unknown ({e})"),
    }

    for motor in Motor::ALL {
        match rig.query_position(motor).await {
            Ok(angle) => println!("{} ({}): {angle}", motor.label(), motor),
            Err(e) => println!("{} ({}): unavailable ({e})", motor.label(), motor),
        }
    }

    let registry = rig.registry();
    let simulated = registry.devices().iter().filter(|d| d.simulation_mode).count();
    println!(
        "Devices: {} ({simulated} in simulation)",
        registry.len()
    );

    Ok(())
}

async fn run_hw_command(rig: &mut Rig<SshSession>, command: HwCommand) -> Result<()> {
    match command {
        HwCommand::List => {
            let registry = rig.registry();
            if registry.is_empty() {
                println!("No devices in {}", registry.remote_path());
                return Ok(());
            }

            let width = registry.names().map(str::len).max().unwrap_or(0);
            println!("\nHardware ({}):\n", registry.remote_path());
            for device in registry.devices() {
                println!("  {:<width$}  {}", device.name, device.mode_label());
            }
            println!();
        }
        HwCommand::Set { name, simulation } => {
            rig.set_simulation_mode(&name, simulation)
                .await
                .with_context(|| format!("Failed to update {name}"))?;
            println!("{name}: {}", mode_label(simulation));
        }
        HwCommand::Toggle { name } => {
            let simulation = rig
                .toggle_simulation_mode(&name)
                .await
                .with_context(|| format!("Failed to toggle {name}"))?;
            println!("{name}: {}", mode_label(simulation));
        }
    }
    Ok(())
}

fn run_config_command(command: ConfigCommand, config: &Config, path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {}.\nUse --force to overwrite",
                    path.display()
                );
            }
            config
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_outcome(outcome: &MoveOutcome) {
    match outcome.previous {
        Some(previous) => println!("{}: {previous} -> {}", outcome.motor, outcome.target),
        None => println!("{}: -> {}", outcome.motor, outcome.target),
    }
}

fn mode_label(simulation: bool) -> &'static str {
    if simulation { "sim" } else { "real" }
}
