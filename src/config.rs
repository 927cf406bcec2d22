//! Persistent configuration handling for TextSnap.
//!
//! Persists configuration in a JSON file:
//! `~/.config/textsnap/config.json` (platform config dir elsewhere).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

const APP_CONFIG_DIR_NAME: &str = "textsnap";
const CONFIG_FILE_NAME: &str = "config.json";

/// Delay used by the relauncher when the config does not set one.
pub const DEFAULT_RELAUNCH_DELAY_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    launch_at_login: Option<bool>,
    #[serde(default)]
    relaunch_delay_ms: Option<u64>,
    #[serde(default)]
    capture_program: Option<String>,
}

impl RawConfig {
    fn drop_empty_strings(mut self) -> Self {
        self.log_level = self.log_level.filter(|s| !s.trim().is_empty());
        self.capture_program = self.capture_program.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Resolved settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub launch_at_login: bool,
    pub relaunch_delay: Duration,
    pub capture_program: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let raw = raw.drop_empty_strings();
        Self {
            log_level: raw
                .log_level
                .as_deref()
                .and_then(LogLevel::from_str)
                .unwrap_or_default(),
            launch_at_login: raw.launch_at_login.unwrap_or(false),
            relaunch_delay: Duration::from_millis(
                raw.relaunch_delay_ms.unwrap_or(DEFAULT_RELAUNCH_DELAY_MS),
            ),
            capture_program: raw.capture_program,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let path = config_dir()?
        .join(APP_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    Some(path)
}

fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(RawConfig::default());
    }

    let data = fs::read_to_string(path)?;
    let cfg = serde_json::from_str(&data)?;
    debug!(?path, "Config loaded");
    Ok(cfg)
}

fn write_raw_config(path: &Path, cfg: RawConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(&cfg.drop_empty_strings())?;
    fs::write(path, data)?;
    debug!(?path, "Config saved");
    Ok(())
}

fn load_raw_config() -> Result<RawConfig, ConfigError> {
    let Some(path) = config_path() else {
        debug!("No config_dir available, using defaults only");
        return Ok(RawConfig::default());
    };
    read_raw_config(&path)
}

fn load_or_default_config() -> RawConfig {
    match load_raw_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = ?err, "Failed to load existing config, starting fresh");
            RawConfig::default()
        }
    }
}

/// Loads the full configuration. Never fails: unreadable files fall back to defaults.
pub fn load_config() -> AppConfig {
    load_or_default_config().into()
}

/// Loads the log level before logging is initialised, so failures go to stderr.
pub fn load_log_level() -> LogLevel {
    match load_raw_config() {
        Ok(cfg) => AppConfig::from(cfg).log_level,
        Err(err) => {
            eprintln!("Config: failed to load config, using default log level: {err:?}");
            LogLevel::default()
        }
    }
}

pub fn save_launch_at_login(enabled: bool) {
    debug!(enabled, "Saving launch at login");
    let mut cfg = load_or_default_config();
    cfg.launch_at_login = Some(enabled);
    if let Err(err) = save_raw_config(cfg) {
        error!(error = ?err, "Failed to save config");
    }
}

fn save_raw_config(cfg: RawConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    write_raw_config(&path, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!(LogLevel::from_str("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str(" WARNING "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("verbose"), None);
    }

    #[test]
    fn defaults_apply_for_missing_and_empty_values() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"log_level": "", "capture_program": "  "}"#).unwrap();
        let cfg = AppConfig::from(raw);

        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.relaunch_delay, Duration::from_millis(500));
        assert!(!cfg.launch_at_login);
        assert_eq!(cfg.capture_program, None);
    }

    #[test]
    fn unknown_keys_and_levels_are_tolerated() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"log_level": "loud", "relaunch_delay_ms": 1500, "extra": true}"#,
        )
        .unwrap();
        let cfg = AppConfig::from(raw);

        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.relaunch_delay, Duration::from_millis(1500));
    }

    #[test]
    fn write_then_read_keeps_values_and_drops_empty_strings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE_NAME);

        let raw = RawConfig {
            log_level: Some("debug".to_string()),
            launch_at_login: Some(true),
            relaunch_delay_ms: None,
            capture_program: Some(String::new()),
        };
        write_raw_config(&path, raw).unwrap();

        let loaded = read_raw_config(&path).unwrap();
        assert_eq!(loaded.log_level.as_deref(), Some("debug"));
        assert_eq!(loaded.launch_at_login, Some(true));
        assert_eq!(loaded.capture_program, None);
    }

    #[test]
    fn missing_file_reads_as_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = read_raw_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded, RawConfig::default());
    }
}
