//! Persisted breakpoint settings
//!
//! Breakpoints are saved as a JSON document:
//!
//! ```json
//! { "breakpoints": [ { "url": "http://a/app.js", "lineNumber": 4, "columnNumber": 0,
//!                      "condition": "", "enabled": true } ] }
//! ```

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::paths::ensure_parent_dir;
use crate::common::{Error, Result};

/// One saved breakpoint, in raw coordinates of the unit loaded from `url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBreakpoint {
    pub url: String,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
    #[serde(default)]
    pub condition: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    breakpoints: Vec<PersistedBreakpoint>,
}

/// Storage for state that outlives a debugging session
pub trait SettingsStore: Send + Sync {
    fn load_breakpoints(&self) -> Result<Vec<PersistedBreakpoint>>;
    fn save_breakpoints(&self, breakpoints: &[PersistedBreakpoint]) -> Result<()>;
}

/// Settings kept in a JSON file
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettings {
    fn load_breakpoints(&self) -> Result<Vec<PersistedBreakpoint>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })?;
        let document: SettingsDocument = serde_json::from_str(&content)?;
        Ok(document.breakpoints)
    }

    fn save_breakpoints(&self, breakpoints: &[PersistedBreakpoint]) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let document = SettingsDocument {
            breakpoints: breakpoints.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        tracing::trace!(path = %self.path.display(), count = breakpoints.len(), "Breakpoints saved");
        Ok(())
    }
}

/// Settings that live only as long as the process
#[derive(Debug, Default)]
pub struct MemorySettings {
    breakpoints: Mutex<Vec<PersistedBreakpoint>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breakpoints(breakpoints: Vec<PersistedBreakpoint>) -> Self {
        Self {
            breakpoints: Mutex::new(breakpoints),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn load_breakpoints(&self) -> Result<Vec<PersistedBreakpoint>> {
        Ok(self.breakpoints.lock().clone())
    }

    fn save_breakpoints(&self, breakpoints: &[PersistedBreakpoint]) -> Result<()> {
        *self.breakpoints.lock() = breakpoints.to_vec();
        Ok(())
    }
}
