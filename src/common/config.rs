//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{config_path, default_settings_path};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Source file presentation settings
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Breakpoint persistence settings
    #[serde(default)]
    pub breakpoints: BreakpointsConfig,

    /// Pretty-printer settings
    #[serde(default)]
    pub formatter: FormatterConfig,
}

/// How source files are presented
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SourcesConfig {
    /// Start in reformat mode (pretty-printed presentation)
    #[serde(default)]
    pub reformat: bool,

    /// Allow live edits of script sources
    #[serde(default)]
    pub can_edit_script_source: bool,
}

/// Breakpoint persistence
#[derive(Debug, Deserialize, Clone)]
pub struct BreakpointsConfig {
    /// Save breakpoints after every change and restore them on enable
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// Where saved breakpoints live (defaults to the data directory)
    #[serde(default)]
    pub settings_file: Option<PathBuf>,
}

impl Default for BreakpointsConfig {
    fn default() -> Self {
        Self {
            persist: default_persist(),
            settings_file: None,
        }
    }
}

fn default_persist() -> bool {
    true
}

/// Pretty-printer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FormatterConfig {
    /// Spaces per nesting level
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

fn default_indent() -> usize {
    4
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Path of the breakpoint settings file
    ///
    /// Falls back to the platform data directory when not configured
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.breakpoints
            .settings_file
            .clone()
            .or_else(default_settings_path)
    }
}
