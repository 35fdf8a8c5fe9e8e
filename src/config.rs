//! Configuration file support for segpaint.
//!
//! Preferences, label choices, groups and COCO export settings are stored as
//! pretty-printed JSON in the user's config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_GROUP, DEFAULT_LABEL, DEFAULT_MASK_COLOR, DEFAULT_ZOOM_FACTOR_BASE};
use crate::model::{MaskStrength, Rgba};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Filter string for `env_logger`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    /// Label choices offered for new masks
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Known mask groups
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,

    #[serde(default)]
    pub coco: CocoConfig,
}

fn default_labels() -> Vec<String> {
    vec![DEFAULT_LABEL.to_string()]
}

fn default_groups() -> Vec<String> {
    vec![DEFAULT_GROUP.to_string()]
}

/// User preferences section of the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Brush color for new masks
    #[serde(default = "default_mask_color")]
    pub default_mask_color: Rgba,

    /// Which model candidate is committed
    #[serde(default)]
    pub mask_strength: MaskStrength,

    /// Zoom multiplier per wheel notch
    #[serde(default = "default_zoom_factor_base")]
    pub zoom_factor_base: f32,
}

fn default_mask_color() -> Rgba {
    DEFAULT_MASK_COLOR
}

fn default_zoom_factor_base() -> f32 {
    DEFAULT_ZOOM_FACTOR_BASE
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            default_mask_color: default_mask_color(),
            mask_strength: MaskStrength::default(),
            zoom_factor_base: default_zoom_factor_base(),
        }
    }
}

impl UserPreferences {
    /// Zoom multiplier for a wheel movement of `notches` (negative zooms out).
    pub fn zoom_factor(&self, notches: f32) -> f32 {
        self.zoom_factor_base.powf(notches)
    }
}

/// COCO export section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoConfig {
    #[serde(default = "default_category_name")]
    pub category_name: String,

    #[serde(default = "default_description")]
    pub description: String,
}

fn default_category_name() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_description() -> String {
    "Exported from segpaint".to_string()
}

impl Default for CocoConfig {
    fn default() -> Self {
        Self {
            category_name: default_category_name(),
            description: default_description(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            labels: default_labels(),
            groups: default_groups(),
            coco: CocoConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "segpaint-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("segpaint").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("segpaint")
                    .join(Self::default_filename())
            })
        }
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the config file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }

    /// Replace the label choices with those in a `labels.txt`.
    pub fn load_labels_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        self.labels = parse_labels(&text);
        log::info!("Loaded {} labels from {:?}", self.labels.len(), path);
        Ok(self.labels.len())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One label per line, trimmed, blank lines dropped, sorted.
pub fn parse_labels(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    labels.sort();
    labels
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
