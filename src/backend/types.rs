//! Backend record types
//!
//! These mirror what a script debugger backend reports: parsed script units,
//! breakpoint records with their resolved locations, and call frames.
//! Lines and columns are zero-based throughout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend-assigned identifier of a raw script unit
pub type UnitId = String;

/// Backend-assigned identifier of a breakpoint
pub type BreakpointId = String;

/// Execution world a script was compiled in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    #[default]
    Main,
    Extensions,
}

/// One independently parsed script body as known to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUnit {
    pub unit_id: UnitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Line of the unit's first character inside its embedding document
    #[serde(default)]
    pub line_offset: u32,
    /// Column of the unit's first character inside its embedding document
    #[serde(default)]
    pub column_offset: u32,
    #[serde(default)]
    pub world: WorldType,
}

impl RawUnit {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            source_url: None,
            line_offset: 0,
            column_offset: 0,
            world: WorldType::Main,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn at(mut self, line_offset: u32, column_offset: u32) -> Self {
        self.line_offset = line_offset;
        self.column_offset = column_offset;
        self
    }

    pub fn in_world(mut self, world: WorldType) -> Self {
        self.world = world;
        self
    }

    /// Identity of the source file this unit belongs to: its URL, or its id
    /// when the unit has no URL.
    pub fn file_id(&self) -> &str {
        self.source_url.as_deref().unwrap_or(&self.unit_id)
    }

    /// Embedding position used to order sibling units
    pub fn embedding(&self) -> (u32, u32) {
        (self.line_offset, self.column_offset)
    }
}

/// A concrete location inside a raw unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub unit_id: UnitId,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// A breakpoint as the backend knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendBreakpoint {
    pub id: BreakpointId,
    /// Set for breakpoints submitted by URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Set for breakpoints submitted by unit id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    /// Requested line
    pub line: u32,
    /// Requested column
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub condition: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Concrete locations the backend attached the breakpoint to
    #[serde(default)]
    pub locations: Vec<RawLocation>,
}

fn default_true() -> bool {
    true
}

impl BackendBreakpoint {
    /// Whether the backend attached at least one concrete location
    pub fn is_resolved(&self) -> bool {
        !self.locations.is_empty()
    }

    /// The raw line and column a presentation should anchor to: the first
    /// concrete location if any, the requested location otherwise.
    pub fn anchor(&self) -> (u32, u32) {
        match self.locations.first() {
            Some(location) => (location.line, location.column),
            None => (self.line, self.column),
        }
    }
}

/// A call frame reported when the debugger pauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCallFrame {
    pub id: String,
    #[serde(default)]
    pub function_name: String,
    pub unit_id: UnitId,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default, rename = "type")]
    pub frame_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_chain: Vec<Value>,
}

/// Why the debugger paused
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PausedDetails {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Kind of a loaded page resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A document that may embed several inline scripts
    Document,
    /// A standalone script file
    Script,
}

/// State of a page resource backing a source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    pub finished: bool,
}

/// Events emitted by the debugger backend
#[derive(Debug, Clone)]
pub enum BackendEvent {
    DebuggerWasEnabled,
    UnitParsed(RawUnit),
    UnitFailedToParse(RawUnit),
    BreakpointResolved(BackendBreakpoint),
    DebuggerPaused {
        frames: Vec<BackendCallFrame>,
        details: PausedDetails,
    },
    DebuggerResumed,
    Reset,
}
