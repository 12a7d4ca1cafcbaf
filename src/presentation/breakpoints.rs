//! Breakpoint projection records

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::backend::{BackendBreakpoint, BreakpointId};
use crate::settings::PersistedBreakpoint;

/// A backend breakpoint as shown on a presented line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedBreakpoint {
    pub id: BreakpointId,
    pub file_id: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub condition: String,
    pub enabled: bool,
    /// The backend attached it to at least one concrete location
    pub resolved: bool,
}

impl PresentedBreakpoint {
    pub(crate) fn from_record(
        record: &BackendBreakpoint,
        file_id: &str,
        url: Option<&str>,
        line: u32,
    ) -> Self {
        Self {
            id: record.id.clone(),
            file_id: file_id.to_string(),
            line,
            url: url.map(str::to_string),
            condition: record.condition.clone(),
            enabled: record.enabled,
            resolved: record.is_resolved(),
        }
    }
}

/// Backend breakpoint records and where each one is currently projected
#[derive(Debug, Default)]
pub(crate) struct BreakpointTable {
    known: BTreeMap<BreakpointId, BackendBreakpoint>,
    projected: HashMap<BreakpointId, (String, u32)>,
}

impl BreakpointTable {
    pub fn remember(&mut self, record: BackendBreakpoint) {
        self.known.insert(record.id.clone(), record);
    }

    pub fn forget(&mut self, id: &str) -> Option<BackendBreakpoint> {
        self.projected.remove(id);
        self.known.remove(id)
    }

    pub fn knows(&self, id: &str) -> bool {
        self.known.contains_key(id)
    }

    pub fn project(&mut self, id: &str, file_id: &str, line: u32) {
        self.projected.insert(id.to_string(), (file_id.to_string(), line));
    }

    /// Presented `(file id, line)` a breakpoint was projected to
    pub fn unproject(&mut self, id: &str) -> Option<(String, u32)> {
        self.projected.remove(id)
    }

    /// Known records with no presented counterpart, in id order
    pub fn unprojected(&self) -> Vec<BackendBreakpoint> {
        self.known
            .values()
            .filter(|record| !self.projected.contains_key(&record.id))
            .cloned()
            .collect()
    }

    pub fn clear_projections(&mut self) {
        self.projected.clear();
    }

    /// Drop records that only make sense for the units of a previous page
    pub fn retain_url_records(&mut self) {
        self.known.retain(|_, record| record.url.is_some());
        self.projected.clear();
    }

    /// URL breakpoints in their persisted form
    pub fn persisted(&self) -> Vec<PersistedBreakpoint> {
        self.known
            .values()
            .filter_map(|record| {
                Some(PersistedBreakpoint {
                    url: record.url.clone()?,
                    line_number: record.line,
                    column_number: record.column,
                    condition: record.condition.clone(),
                    enabled: record.enabled,
                })
            })
            .collect()
    }
}
