//! In-memory collaborators for exercising the presentation model
//!
//! [`ScriptedBackend`] stands in for a live debugger: it serves unit sources,
//! hands out breakpoint ids, and records every request so tests can assert
//! on what the model asked for. [`StaticResources`] plays the page.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::backend::{
    BackendBreakpoint, DebuggerBackend, RawLocation, RawUnit, ResourceInfo, ResourceKind,
    ResourceProvider,
};
use crate::common::{Error, Result};

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct ScriptedState {
    sources: HashMap<String, String>,
    units: Vec<RawUnit>,
    fetch_counts: HashMap<String, usize>,
    failing: HashSet<String>,
    breakpoints: HashMap<String, BackendBreakpoint>,
    next_breakpoint: u32,
    line_snaps: HashMap<u32, u32>,
    decline_breakpoints: bool,
    edit_rejection: Option<String>,
    removed: Vec<String>,
    edits: Vec<(String, String)>,
    selected_frames: Vec<String>,
    continued: Vec<RawLocation>,
}

/// Debugger backend driven entirely by the test
pub struct ScriptedBackend {
    state: Mutex<ScriptedState>,
    held: AtomicBool,
    gate: Semaphore,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptedState::default()),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn add_source(&self, unit_id: &str, text: &str) {
        self.state
            .lock()
            .sources
            .insert(unit_id.to_string(), text.to_string());
    }

    /// Make URL breakpoints resolve to locations inside `unit`
    pub fn register_unit(&self, unit: &RawUnit) {
        self.state.lock().units.push(unit.clone());
    }

    pub fn fail_fetch(&self, unit_id: &str) {
        self.state.lock().failing.insert(unit_id.to_string());
    }

    pub fn heal_fetch(&self, unit_id: &str) {
        self.state.lock().failing.remove(unit_id);
    }

    /// Source fetches started for `unit_id`, including ones still held
    pub fn fetch_count(&self, unit_id: &str) -> usize {
        self.state
            .lock()
            .fetch_counts
            .get(unit_id)
            .copied()
            .unwrap_or(0)
    }

    /// Park every subsequent source fetch until released
    pub fn hold_fetches(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_fetches(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Breakpoints requested on raw line `from` resolve to `to`
    pub fn snap_line(&self, from: u32, to: u32) {
        self.state.lock().line_snaps.insert(from, to);
    }

    pub fn decline_breakpoints(&self, decline: bool) {
        self.state.lock().decline_breakpoints = decline;
    }

    pub fn reject_edits(&self, reason: &str) {
        self.state.lock().edit_rejection = Some(reason.to_string());
    }

    pub fn breakpoints(&self) -> Vec<BackendBreakpoint> {
        let mut breakpoints: Vec<BackendBreakpoint> =
            self.state.lock().breakpoints.values().cloned().collect();
        breakpoints.sort_by(|a, b| a.id.cmp(&b.id));
        breakpoints
    }

    pub fn removed_breakpoints(&self) -> Vec<String> {
        self.state.lock().removed.clone()
    }

    pub fn edits(&self) -> Vec<(String, String)> {
        self.state.lock().edits.clone()
    }

    pub fn selected_frames(&self) -> Vec<String> {
        self.state.lock().selected_frames.clone()
    }

    pub fn continued(&self) -> Vec<RawLocation> {
        self.state.lock().continued.clone()
    }

    fn create_breakpoint(
        &self,
        url: Option<&str>,
        unit_id: Option<&str>,
        line: u32,
        column: u32,
        condition: &str,
        enabled: bool,
    ) -> Option<BackendBreakpoint> {
        let mut state = self.state.lock();
        if state.decline_breakpoints {
            return None;
        }
        state.next_breakpoint += 1;
        let id = state.next_breakpoint.to_string();
        let resolved_line = state.line_snaps.get(&line).copied().unwrap_or(line);

        let owner = match (url, unit_id) {
            (_, Some(unit_id)) => Some(unit_id.to_string()),
            (Some(url), None) => state
                .units
                .iter()
                .filter(|unit| unit.source_url.as_deref() == Some(url))
                .filter(|unit| unit.line_offset <= resolved_line)
                .last()
                .map(|unit| unit.unit_id.clone()),
            (None, None) => None,
        };
        let locations = owner
            .map(|unit_id| RawLocation {
                unit_id,
                line: resolved_line,
                column,
            })
            .into_iter()
            .collect();

        let breakpoint = BackendBreakpoint {
            id: id.clone(),
            url: url.map(str::to_string),
            unit_id: unit_id.map(str::to_string),
            line,
            column,
            condition: condition.to_string(),
            enabled,
            locations,
        };
        state.breakpoints.insert(id, breakpoint.clone());
        Some(breakpoint)
    }
}

#[async_trait]
impl DebuggerBackend for ScriptedBackend {
    async fn set_breakpoint_by_url(
        &self,
        url: &str,
        line: u32,
        column: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<BackendBreakpoint>> {
        Ok(self.create_breakpoint(Some(url), None, line, column, condition, enabled))
    }

    async fn set_breakpoint_by_unit_id(
        &self,
        unit_id: &str,
        line: u32,
        column: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<BackendBreakpoint>> {
        Ok(self.create_breakpoint(None, Some(unit_id), line, column, condition, enabled))
    }

    async fn remove_breakpoint(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.breakpoints.remove(id);
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn edit_unit_source(&self, unit_id: &str, new_text: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.edit_rejection {
            return Err(Error::backend_request_failed("editUnitSource", reason));
        }
        state
            .sources
            .insert(unit_id.to_string(), new_text.to_string());
        state
            .edits
            .push((unit_id.to_string(), new_text.to_string()));
        Ok(())
    }

    async fn fetch_unit_source(&self, unit_id: &str) -> Result<String> {
        let result = {
            let mut state = self.state.lock();
            *state.fetch_counts.entry(unit_id.to_string()).or_default() += 1;
            if state.failing.contains(unit_id) {
                Err(Error::backend_request_failed("fetchUnitSource", "unit source unavailable"))
            } else {
                state
                    .sources
                    .get(unit_id)
                    .cloned()
                    .ok_or_else(|| Error::UnitNotFound(unit_id.to_string()))
            }
        };

        if self.held.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
            permit.forget();
        }
        result
    }

    async fn evaluate_in_frame(&self, frame_id: &str, expression: &str) -> Result<Value> {
        Ok(json!({ "frameId": frame_id, "expression": expression }))
    }

    async fn continue_to_location(&self, location: &RawLocation) -> Result<()> {
        self.state.lock().continued.push(location.clone());
        Ok(())
    }

    async fn select_call_frame(&self, frame_id: &str) -> Result<()> {
        self.state.lock().selected_frames.push(frame_id.to_string());
        Ok(())
    }
}

struct PageResource {
    kind: ResourceKind,
    finished: bool,
    content: String,
    fetches: usize,
}

/// Page resources with fixed content
#[derive(Default)]
pub struct StaticResources {
    resources: Mutex<HashMap<String, PageResource>>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, url: &str, content: &str, finished: bool) {
        self.add(url, ResourceKind::Document, content, finished);
    }

    pub fn add_script(&self, url: &str, content: &str, finished: bool) {
        self.add(url, ResourceKind::Script, content, finished);
    }

    fn add(&self, url: &str, kind: ResourceKind, content: &str, finished: bool) {
        self.resources.lock().insert(
            url.to_string(),
            PageResource {
                kind,
                finished,
                content: content.to_string(),
                fetches: 0,
            },
        );
    }

    pub fn finish(&self, url: &str) {
        if let Some(resource) = self.resources.lock().get_mut(url) {
            resource.finished = true;
        }
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.resources
            .lock()
            .get(url)
            .map(|resource| resource.fetches)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ResourceProvider for StaticResources {
    fn resource(&self, url: &str) -> Option<ResourceInfo> {
        let resources = self.resources.lock();
        let resource = resources.get(url)?;
        Some(ResourceInfo {
            kind: resource.kind,
            finished: resource.finished,
        })
    }

    async fn fetch_resource_content(&self, url: &str) -> Result<String> {
        let mut resources = self.resources.lock();
        let resource = resources
            .get_mut(url)
            .ok_or_else(|| Error::content_unavailable(url, "no such resource"))?;
        resource.fetches += 1;
        Ok(resource.content.clone())
    }
}
