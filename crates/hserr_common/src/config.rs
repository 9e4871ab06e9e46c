//! hserr configuration.
//!
//! Config file: `--config <FILE>`, else ~/.config/hserr/config.toml, else
//! /etc/hserr/config.toml, else built-in defaults.

use crate::error::HserrError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Unidentified lines kept per dump before further ones are only counted.
pub const DEFAULT_UNIDENTIFIED_CAPACITY: usize = 1000;

/// Color display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when writing to a terminal
    #[default]
    Auto,
    /// Always emit ANSI colors
    Always,
    /// Plain text
    Never,
}

impl ColorMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" | "on" | "yes" | "true" => Some(Self::Always),
            "never" | "off" | "no" | "false" | "none" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Upper bound on retained unidentified lines
    #[serde(default = "default_unidentified_capacity")]
    pub unidentified_capacity: usize,
}

fn default_unidentified_capacity() -> usize {
    DEFAULT_UNIDENTIFIED_CAPACITY
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            unidentified_capacity: DEFAULT_UNIDENTIFIED_CAPACITY,
        }
    }
}

/// A release newer than the built-in table knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// `21.0.9+10`, `1.8.0_472-b08`
    pub version: String,
    /// GA date, `YYYY-MM-DD`
    pub date: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub color: ColorMode,
}

/// Main hserr configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HserrConfig {
    #[serde(default)]
    pub parser: ParserConfig,

    /// Extra entries for the release-currency table
    #[serde(default)]
    pub releases: Vec<ReleaseEntry>,

    #[serde(default)]
    pub output: OutputConfig,
}

impl HserrConfig {
    /// User config path: ~/.config/hserr/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hserr").join("config.toml"))
    }

    /// System config path: /etc/hserr/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/hserr/config.toml")
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the user config wins over
    /// the system config, and defaults apply when neither exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, HserrError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::from_file(&system_path);
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, HserrError> {
        let contents = fs::read_to_string(path).map_err(|source| HserrError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, HserrError> {
        Ok(toml::from_str(contents)?)
    }
}
