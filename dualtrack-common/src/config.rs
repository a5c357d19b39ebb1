//! Bootstrap configuration
//!
//! A small TOML file read once at startup. Missing files are not fatal:
//! the player warns and falls back to built-in defaults. A file that exists
//! but does not parse or validate is an error.
//!
//! # Config File Resolution Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`DUALTRACK_CONFIG`)
//! 3. Platform config directory (`<config_dir>/dualtrack/config.toml`)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "DUALTRACK_CONFIG";

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playback: PlaybackSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Playback tuning shared by the controller and the bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Clock tick of a playing binding, i.e. the TimeAdvanced cadence
    #[serde(default = "default_time_update_interval_ms")]
    pub time_update_interval_ms: u64,

    /// Upper bound on fetch + probe. Absent means a load may hang forever.
    #[serde(default)]
    pub load_timeout_ms: Option<u64>,

    /// A handed-off position never lands closer than this to the end
    #[serde(default = "default_handoff_end_guard_secs")]
    pub handoff_end_guard_secs: f64,

    /// Buffered PlayerEvents per subscriber before lagging
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            time_update_interval_ms: default_time_update_interval_ms(),
            load_timeout_ms: None,
            handoff_end_guard_secs: default_handoff_end_guard_secs(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl PlaybackSettings {
    pub fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_interval_ms)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_time_update_interval_ms() -> u64 {
    250
}

fn default_handoff_end_guard_secs() -> f64 {
    0.25
}

fn default_event_bus_capacity() -> usize {
    100
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if playback.time_update_interval_ms == 0 {
            return Err(Error::Config(
                "playback.time_update_interval_ms must be greater than 0".to_string(),
            ));
        }
        if playback.event_bus_capacity == 0 {
            return Err(Error::Config(
                "playback.event_bus_capacity must be greater than 0".to_string(),
            ));
        }
        if !playback.handoff_end_guard_secs.is_finite() || playback.handoff_end_guard_secs < 0.0 {
            return Err(Error::Config(format!(
                "playback.handoff_end_guard_secs must be a non-negative number, got {}",
                playback.handoff_end_guard_secs
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dualtrack").join("config.toml"))
}

/// Pick the config file to read, following the resolution priority.
///
/// Explicit choices (argument, environment) are returned even when the file
/// does not exist so the caller can warn about them; the platform default is
/// only returned when it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// An explicitly requested file that does not exist
    Missing(PathBuf),
    /// No file requested and none at the platform location
    Defaults,
}

impl ConfigSource {
    /// Report the outcome. Call once a subscriber is installed, since the
    /// log level itself comes from the loaded config.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                info!("Loaded configuration from {}", path.display())
            }
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            ),
            ConfigSource::Defaults => info!("No config file found, using built-in defaults"),
        }
    }
}

/// Resolve and load configuration, degrading to defaults when no file exists
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = TomlConfig::load(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}
