//! `rover` – run a mission against the simulated drive train.
//!
//! - `rover run` loads `~/.rover/config.toml` (or `--config`), builds the
//!   selected mission tree and ticks it at the configured period until it
//!   finishes, the tick limit is hit, or Ctrl-C is pressed.
//! - `rover init` writes a default config file.

mod config;
mod mission;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rover_hal::{DifferentialDrive, drive_train};
use rover_runtime::behavior_tree::{MonotonicClock, State};
use rover_runtime::{TickLoop, init_tracing};
use rover_types::RoverError;
use tracing::{info, warn};

use crate::config::{Config, Mission};

#[derive(Parser)]
#[command(name = "rover")]
#[command(about = "Behavior-tree control for a small differential-drive robot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission in simulation
    Run {
        /// Mission to run (overrides the config file)
        #[arg(short, long, value_enum)]
        mission: Option<Mission>,

        /// Tick period in milliseconds
        #[arg(long = "period-ms", value_name = "MS")]
        period_ms: Option<u64>,

        /// Stop after this many ticks
        #[arg(long = "max-ticks", value_name = "N")]
        max_ticks: Option<u64>,

        /// Config file (defaults to ~/.rover/config.toml)
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Write a default config file
    Init {
        /// Where to write it (defaults to ~/.rover/config.toml)
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _telemetry = init_tracing("rover");

    match cli.command {
        Commands::Run {
            mission,
            period_ms,
            max_ticks,
            config,
        } => {
            print_banner();
            let path = config.unwrap_or_else(config::config_path);
            let mut cfg = match load_or_default(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    println!("{}: {}", "Config error".red(), e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(m) = mission {
                cfg.mission = m;
            }
            if let Some(ms) = period_ms.filter(|ms| *ms > 0) {
                cfg.tick_period_ms = ms;
            }
            if max_ticks.is_some() {
                cfg.max_ticks = max_ticks;
            }

            match run_mission(&cfg) {
                Ok(State::Success) => {
                    println!("  {} mission {} succeeded", "✓".green().bold(), cfg.mission);
                    ExitCode::SUCCESS
                }
                Ok(State::Failure) => {
                    println!("  {} mission {} failed", "✗".red().bold(), cfg.mission);
                    ExitCode::FAILURE
                }
                Ok(State::Running) => {
                    println!(
                        "  {} mission {} stopped before finishing",
                        "•".yellow().bold(),
                        cfg.mission
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}: {}", "Mission aborted".red(), e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Init { config, force } => {
            let path = config.unwrap_or_else(config::config_path);
            if path.exists() && !force {
                println!(
                    "  Config already exists at {} (use {} to overwrite)",
                    path.display().to_string().bold(),
                    "--force".bold()
                );
                return ExitCode::FAILURE;
            }
            match config::save_to(&Config::default(), &path) {
                Ok(()) => {
                    println!(
                        "  {} Config saved to {}",
                        "✓".green().bold(),
                        path.display().to_string().bold()
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}: {}", "Error saving config".red(), e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn load_or_default(path: &std::path::Path) -> Result<Config, RoverError> {
    match config::load_from(path)? {
        Some(cfg) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            Ok(cfg)
        }
        None => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mission run
// ─────────────────────────────────────────────────────────────────────────────

fn run_mission(cfg: &Config) -> Result<State, RoverError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this tick …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; Ctrl-C will kill the process");
    }

    let clock = MonotonicClock::shared();
    let model = DifferentialDrive::new(cfg.axle_width, cfg.wheel_radius, cfg.wheel_radius)?;
    let mut tree = mission::build(cfg, clock.clone())?;
    let mut robot = mission::initial_state(cfg.mission);

    let mut driver = TickLoop::new(Duration::from_millis(cfg.tick_period_ms), clock.clone())
        .with_sidecar(drive_train(model, clock));
    if let Some(limit) = cfg.max_ticks {
        driver = driver.with_max_ticks(limit);
    }

    info!(mission = %cfg.mission, period_ms = cfg.tick_period_ms, "mission starting");
    let result = driver.run(&mut tree, &mut robot, &shutdown);

    mission::bring_to_rest(&mut driver, &mut robot);

    println!();
    println!(
        "  ticks {}  travelled {:.3} m  pose ({:.3}, {:.3}, {:.1}°)",
        driver.ticks(),
        robot.travelled_distance,
        robot.pose.x,
        robot.pose.y,
        robot.pose.heading_rad.to_degrees()
    );
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____                       "#.bold().cyan());
    println!("{}", r#"  / __ \____ _   _____  _____ "#.bold().cyan());
    println!("{}", r#" / /_/ / __ \ | / / _ \/ ___/ "#.bold().cyan());
    println!("{}", r#"/ _, _/ /_/ / |/ /  __/ /     "#.bold().cyan());
    println!("{}", r#"/_/ |_|\____/|___/\___/_/      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Rover".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Behavior-tree mission runner");
    println!();
}
