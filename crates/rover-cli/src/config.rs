//! Rover configuration – reads/writes `~/.rover/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use rover_types::RoverError;
use serde::{Deserialize, Serialize};

/// Which behavior tree `rover run` drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mission {
    /// Drive the four sides of a square.
    #[default]
    Square,
    /// Sweep left and right with widening turns.
    Wiggle,
    /// Drive until a bumper is hit, turn away, repeat.
    Bumpers,
    /// Track the edge of a line with alternating arcs.
    Line,
}

impl Mission {
    /// Case-insensitive lookup by the name used on the command line and in
    /// `config.toml`.
    pub fn parse(value: &str) -> Option<Self> {
        <Mission as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

impl std::fmt::Display for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

/// Persisted configuration stored in `~/.rover/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tick period of the control loop in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    #[serde(default)]
    pub mission: Mission,

    /// Cruise speed for driving maneuvers, m/s.
    #[serde(default = "default_drive_speed")]
    pub drive_speed: f64,

    /// Side of the square mission, metres.
    #[serde(default = "default_side_length")]
    pub side_length: f64,

    #[serde(default = "default_axle_width")]
    pub axle_width: f64,

    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f64,

    /// Stop after this many ticks even if the mission is still running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,
}

fn default_tick_period_ms() -> u64 {
    30
}
fn default_drive_speed() -> f64 {
    0.14
}
fn default_side_length() -> f64 {
    0.3
}
fn default_axle_width() -> f64 {
    0.2
}
fn default_wheel_radius() -> f64 {
    0.03
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            mission: Mission::default(),
            drive_speed: default_drive_speed(),
            side_length: default_side_length(),
            axle_width: default_axle_width(),
            wheel_radius: default_wheel_radius(),
            max_ticks: None,
        }
    }
}

impl Config {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

/// Return the path to `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load the config from `path` and apply `ROVER_*` overrides.  Returns
/// `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, RoverError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RoverError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| RoverError::Config(format!("failed to parse {}: {e}", path.display())))?;
    if cfg.tick_period_ms == 0 {
        return Err(RoverError::Config(format!(
            "{}: tick_period_ms must be greater than 0",
            path.display()
        )));
    }
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_TICK_PERIOD_MS` | `tick_period_ms` |
/// | `ROVER_MISSION` | `mission` |
/// | `ROVER_DRIVE_SPEED` | `drive_speed` |
/// | `ROVER_SIDE_LENGTH` | `side_length` |
/// | `ROVER_AXLE_WIDTH` | `axle_width` |
/// | `ROVER_WHEEL_RADIUS` | `wheel_radius` |
/// | `ROVER_MAX_TICKS` | `max_ticks` |
///
/// Values that do not parse are ignored, as are a zero tick period and
/// non-positive drive geometry.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROVER_TICK_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
        && ms > 0
    {
        cfg.tick_period_ms = ms;
    }
    if let Some(mission) = lookup("ROVER_MISSION").as_deref().and_then(Mission::parse) {
        cfg.mission = mission;
    }
    if let Some(v) = lookup("ROVER_DRIVE_SPEED")
        && let Ok(speed) = v.parse::<f64>()
    {
        cfg.drive_speed = speed;
    }
    if let Some(v) = lookup("ROVER_SIDE_LENGTH")
        && let Ok(len) = v.parse::<f64>()
    {
        cfg.side_length = len;
    }
    if let Some(v) = lookup("ROVER_AXLE_WIDTH")
        && let Ok(width) = v.parse::<f64>()
        && width > 0.0
    {
        cfg.axle_width = width;
    }
    if let Some(v) = lookup("ROVER_WHEEL_RADIUS")
        && let Ok(radius) = v.parse::<f64>()
        && radius > 0.0
    {
        cfg.wheel_radius = radius;
    }
    if let Some(v) = lookup("ROVER_MAX_TICKS")
        && let Ok(n) = v.parse::<u64>()
    {
        cfg.max_ticks = Some(n);
    }
}

/// Save the config to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), RoverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RoverError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                RoverError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoverError::Config(format!("failed to serialize config: {e}")))?;
    let write_err = |e: std::io::Error| {
        RoverError::Config(format!("failed to write {}: {e}", path.display()))
    };
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
