//! # Roll-off Roof Controller Binary
//!
//! Runs the roof poll loop or executes a single roof command.
//!
//! # Usage
//!
//! ```bash
//! # Poll loop with the simulated roof
//! ror_control --config config/roof.toml --simulate
//!
//! # Open the roof on real hardware and wait for the limit switch
//! ror_control --config /etc/rolloff/roof.toml open
//!
//! # Print the current status as JSON
//! ror_control -s status
//!
//! # Validate the pin map without touching hardware
//! ror_control --config config/roof.toml check
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand, ValueEnum};
use ror_common::config::{LogLevel, RoofConfig};
use ror_control::publisher::{JsonPublisher, LogPublisher, StatusPublisher, StatusReport};
use ror_control::{NoMountLock, Poller, RoofController};
use ror_hal::DriverRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Roll-off roof controller
#[derive(Parser, Debug)]
#[command(name = "ror_control")]
#[command(version)]
#[command(about = "Roll-off observatory roof controller")]
#[command(long_about = None)]
struct Args {
    /// Path to the roof configuration file (roof.toml)
    #[arg(short, long, default_value = "/etc/rolloff/roof.toml")]
    config: PathBuf,

    /// Force the simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// GPIO driver to load (overrides [gpio] driver)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Publish status changes as JSON lines on stdout
    #[arg(long)]
    status_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the poll loop until interrupted (default)
    Run,
    /// Open the roof and wait for the opened switch
    Open,
    /// Close the roof and wait for the closed switch
    Close,
    /// Close the roof as a park request
    Park,
    /// Open the roof as an unpark request
    Unpark,
    /// Print the current roof status
    Status,
    /// Drive the lock relay
    Lock {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Drive the auxiliary relay
    Aux {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Validate configuration and pin map, then exit
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        self == Self::On
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("FATAL: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The config decides the default log level, so load it first.
    let loaded = RoofConfig::load_validated(&args.config);
    let level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let config = loaded?;

    info!(
        "Roll-off roof controller v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let command = args.command.unwrap_or(Command::Run);
    let drivers = DriverRegistry::with_builtin_drivers();

    if command == Command::Check {
        return check(&config, &drivers);
    }

    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else {
        args.driver.clone().unwrap_or_else(|| config.gpio.driver.clone())
    };
    let port = drivers.create_port(&driver_name)?;

    let publisher: Box<dyn StatusPublisher> = if args.status_json {
        Box::new(JsonPublisher::new(std::io::stdout()))
    } else {
        Box::new(LogPublisher)
    };

    let poll_settings = config.poll.clone();
    let mut controller =
        RoofController::new(config, port, Box::new(NoMountLock), publisher)?
            .with_config_path(&args.config);
    controller.connect()?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let mut poller = Poller::new(&poll_settings);
    let result = match command {
        Command::Run => {
            poller.run(&mut controller, &running);
            Ok(())
        }
        Command::Open | Command::Close | Command::Park | Command::Unpark => {
            let now = Instant::now();
            let started = match command {
                Command::Open => controller.open(now),
                Command::Close => controller.close(now),
                Command::Park => controller.park(now),
                _ => controller.unpark(now),
            };
            started
                .and_then(|_| poller.run_until_idle(&mut controller, &running))
                .map(|outcome| info!(?outcome, "Roof command finished"))
        }
        Command::Status => {
            let report = StatusReport::new(controller.status(), controller.park_status());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Lock { state } => controller.set_lock(state.is_on()).map(|_| ()),
        Command::Aux { state } => controller.set_aux(state.is_on()).map(|_| ()),
        Command::Check => Ok(()),
    };

    controller.disconnect();
    result?;
    info!("Roll-off roof controller shutdown complete");
    Ok(())
}

/// Report the configuration without touching hardware.
fn check(config: &RoofConfig, drivers: &DriverRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ror_common::io::registry::PinRegistry::configure(&config.io)?;
    info!(
        functions = registry.len(),
        timeout_s = config.roof.motion_timeout_s,
        drivers = ?drivers.list_drivers(),
        "Configuration parsed"
    );
    registry.validate_required()?;
    info!("Configuration complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and config level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
