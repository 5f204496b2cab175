//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` (or the file named by
//! `PARLEY_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use parley_core::Permission;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Locale skills are evaluated in (e.g. "en", "en-US")
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Per-tier acceptance thresholds
    #[serde(default)]
    pub ranker: RankerConfig,

    /// Evaluator loop settings
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Periodic auto-refresh settings
    #[serde(default)]
    pub auto_runner: AutoRunnerConfig,

    /// Skill id -> enabled. Skills not listed are enabled.
    #[serde(default)]
    pub skills: HashMap<String, bool>,

    /// Permissions the user has granted up front
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Contact book used by the telephone skill
    #[serde(default)]
    pub contacts: Vec<ContactConfig>,
}

fn default_locale() -> String {
    "en".into()
}
fn default_true() -> bool {
    true
}

/// Minimum score the best candidate of a tier needs to be picked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankerConfig {
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,

    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
}

fn default_high_threshold() -> f64 {
    0.85
}
fn default_medium_threshold() -> f64 {
    0.90
}
fn default_low_threshold() -> f64 {
    0.95
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            medium_threshold: default_medium_threshold(),
            low_threshold: default_low_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Whether the fallback asks the user to repeat unrecognized commands
    #[serde(default = "default_true")]
    pub ask_to_repeat: bool,

    /// Input events that may wait while a turn is running
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    32
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            ask_to_repeat: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRunnerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AutoRunnerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub granted: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: String,

    #[serde(default)]
    pub numbers: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment overrides:
    /// - `PARLEY_CONFIG` replaces the config file path
    /// - `PARLEY_LOCALE` replaces the locale
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if let Ok(locale) = std::env::var("PARLEY_LOCALE") {
            config.locale = locale;
            config.validate()?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// The config file `load` reads.
    pub fn config_path() -> PathBuf {
        std::env::var("PARLEY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locale.trim().is_empty() {
            return Err(ConfigError::ValidationError("locale must not be empty".into()));
        }

        let thresholds = [
            ("high_threshold", self.ranker.high_threshold),
            ("medium_threshold", self.ranker.medium_threshold),
            ("low_threshold", self.ranker.low_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "ranker.{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if self.evaluator.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "evaluator.queue_capacity must be > 0".into(),
            ));
        }

        if let Some(contact) = self.contacts.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "contact with numbers {:?} has an empty name",
                contact.numbers
            )));
        }

        Ok(())
    }

    /// Whether the skill with `id` is enabled. Unlisted skills are.
    pub fn is_skill_enabled(&self, id: &str) -> bool {
        self.skills.get(id).copied().unwrap_or(true)
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.permissions.granted.contains(&permission)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            ranker: RankerConfig::default(),
            evaluator: EvaluatorConfig::default(),
            auto_runner: AutoRunnerConfig::default(),
            skills: HashMap::new(),
            permissions: PermissionsConfig::default(),
            contacts: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for parley_core::Error {
    fn from(err: ConfigError) -> Self {
        parley_core::Error::Config {
            message: err.to_string(),
        }
    }
}
