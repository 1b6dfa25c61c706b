//! Configuration file support for VOAI.
//!
//! User preferences are stored as versioned JSON in the platform config
//! directory and turned into [`SessionSettings`](crate::session::SessionSettings)
//! when a session starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color_utils::Color;
use crate::constants::{
    DEFAULT_FILL_COLOR, DEFAULT_FONT_SIZE, DEFAULT_LINE_COLOR, DEFAULT_LINE_THICKNESS,
    DEFAULT_VERTICES_PER_SHAPE,
};

/// Verbosity of the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    /// Loads, saves and other user-visible operations
    #[default]
    Info,
    /// State transitions
    Debug,
    /// Every pointer event
    Trace,
}

impl LogLevel {
    const LEVELS: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Levels from quietest to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &Self::LEVELS
    }

    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Config file format version written by this build. Files with a higher
/// version are rejected.
pub const CONFIG_VERSION: u32 = 1;

/// Contents of `voai-config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_app_name() -> String {
    "VOAI".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Outline color of shapes being drawn
    #[serde(default = "default_line_color")]
    pub line_color: Color,

    /// Fill color of a drawn shape waiting for its category
    #[serde(default = "default_fill_color")]
    pub fill_color: Color,

    #[serde(default = "default_line_thickness")]
    pub line_thickness: u32,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Save annotations without asking when leaving an image
    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Reuse the last category instead of prompting
    #[serde(default)]
    pub single_class: bool,

    /// Draw and resize shapes as squares
    #[serde(default)]
    pub draw_square: bool,

    /// Paint the category name next to each shape
    #[serde(default)]
    pub paint_label: bool,

    /// Clicks needed to close a shape
    #[serde(default = "default_vertices_per_shape")]
    pub vertices_per_shape: usize,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_line_color() -> Color {
    DEFAULT_LINE_COLOR
}

fn default_fill_color() -> Color {
    DEFAULT_FILL_COLOR
}

fn default_line_thickness() -> u32 {
    DEFAULT_LINE_THICKNESS
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_true() -> bool {
    true
}

fn default_vertices_per_shape() -> usize {
    DEFAULT_VERTICES_PER_SHAPE
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            line_color: default_line_color(),
            fill_color: default_fill_color(),
            line_thickness: default_line_thickness(),
            font_size: default_font_size(),
            auto_save: default_true(),
            single_class: false,
            draw_square: false,
            paint_label: false,
            vertices_per_shape: default_vertices_per_shape(),
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a config, refusing files written by a newer version.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "voai-config.json"
    }

    /// `<config dir>/voai/voai-config.json`, with `~/.config` standing in
    /// for platforms without a config dir.
    pub fn default_path() -> Option<PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("voai").join(Self::default_filename()))
    }

    /// Config at the default path, `None` if absent or unusable.
    pub fn load_from_default_path() -> Option<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Like [`read`](Self::read), but a missing or broken file only logs.
    pub fn load_from(path: &Path) -> Option<Self> {
        if !path.exists() {
            log::debug!("No config file at {:?}", path);
            return None;
        }
        Self::read(path)
            .map_err(|e| log::warn!("Ignoring config file {:?}: {}", path, e))
            .ok()
    }

    /// Write the config, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Configuration version {file_version} is newer than {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.line_color, DEFAULT_LINE_COLOR);
        assert_eq!(prefs.vertices_per_shape, 4);
        assert!(prefs.auto_save);
        assert!(!prefs.single_class);
        assert_eq!(prefs.log_level, LogLevel::Info);
    }

    #[test]
    fn test_missing_preferences_use_defaults() {
        let config = AppConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(config.app_name, "VOAI");
        assert_eq!(config.preferences, UserPreferences::default());

        let config = AppConfig::from_json(
            r#"{"version": 1, "preferences": {"single_class": true, "log_level": "debug"}}"#,
        )
        .unwrap();
        assert!(config.preferences.single_class);
        assert_eq!(config.preferences.log_level, LogLevel::Debug);
        assert_eq!(config.preferences.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_rejects_newer_version() {
        let err = AppConfig::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                supported_version: CONFIG_VERSION
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            AppConfig::from_json("{"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/voai-config.json");

        let mut config = AppConfig::new();
        config.preferences.draw_square = true;
        config.preferences.line_color = Color::new(1, 2, 3, 4);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.preferences, config.preferences);
        assert!(AppConfig::load_from(&tmp.path().join("none.json")).is_none());
    }

    #[test]
    fn test_read_reports_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::read(&tmp.path().join("none.json")),
            Err(ConfigError::IoError(_))
        ));

        let path = tmp.path().join("new.json");
        std::fs::write(&path, r#"{"version": 2}"#).unwrap();
        assert!(matches!(
            AppConfig::read(&path),
            Err(ConfigError::VersionTooNew { .. })
        ));
        assert!(AppConfig::load_from(&path).is_none());
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::all().len(), 5);
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.name(), "Trace");
    }
}
