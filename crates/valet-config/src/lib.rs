//! Configuration for the valet CLI.
//!
//! A TOML file layered over built-in defaults and `VALET_*` environment
//! variables, plus translation to `valet_core::EngineConfig`. The CLI
//! adds `GlobalOpts`-aware wrappers on top.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use valet_core::{CoreError, DEFAULT_CAPACITY, EngineConfig, Layout, RateTable};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "VALET_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Where the JSON collections live. Platform data dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Fixed number of spots in the lot.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Initial rate table. Once saved, the lot's own settings win.
    #[serde(default)]
    pub rates: RateTable,

    /// Initial layout. Replaces the built-in layout entirely when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sectors: Option<Layout>,

    /// Output defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            capacity: default_capacity(),
            rates: RateTable::default(),
            sectors: None,
            defaults: Defaults::default(),
        }
    }
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

impl Config {
    /// Resolved data directory: configured path, else the platform data dir.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Layout in effect: the configured one or the built-in default.
    pub fn layout(&self) -> Layout {
        self.sectors.clone().unwrap_or_default()
    }

    /// Validate and build the engine configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let layout = self.layout();
        layout
            .validate(self.capacity)
            .map_err(|e| validation("sectors", &e))?;
        self.rates.validate().map_err(|e| validation("rates", &e))?;

        Ok(EngineConfig {
            capacity: self.capacity,
            layout,
            rates: self.rates,
        })
    }
}

fn validation(field: &str, err: &CoreError) -> ConfigError {
    let reason = match err {
        CoreError::InvalidConfiguration { reason } => reason.clone(),
        other => other.to_string(),
    };
    ConfigError::Validation {
        field: field.into(),
        reason,
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path: `VALET_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "valet", "valet").map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "valet", "valet").map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("valet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, layered defaults -> file -> `VALET_*` env.
///
/// A missing file is not an error. Nested keys use a double underscore:
/// `VALET_RATES__FIRST_HOUR=20`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VALET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
