//! Debugger presentation model
//!
//! Consumes backend events, keeps the source file registry and the breakpoint
//! and call stack projections consistent with each other, and publishes
//! [`PresentationEvent`]s for the UI.
//!
//! Breakpoint mutations await the backend, so they are serialized by an async
//! mutex: every public breakpoint operation takes it once and runs the
//! `*_locked` helpers underneath. Nothing waits for source content while
//! holding it. Mappings a caller asked for are resolved before the lock is
//! taken, and projections onto a file whose content is not loaded yet are
//! finished by a task that waits for that load.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::backend::{
    BackendBreakpoint, BackendCallFrame, BackendEvent, DebuggerBackend, NoResources,
    PausedDetails, RawLocation, RawUnit, ResourceProvider,
};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::diff::diff_text;
use crate::events::PresentationEvent;
use crate::mapping::{LineEndings, SourceMapping};
use crate::settings::{FileSettings, MemorySettings, SettingsStore};
use crate::sources::{
    BasicFormatter, ContentLoader, ScriptFormatter, SourceContent, SourceFile, SourceFileKind,
    SourceRegistry,
};

use super::breakpoints::{BreakpointTable, PresentedBreakpoint};
use super::call_stack::{CallStack, FrameLocation, PresentedCallFrame};
use super::console::{ConsoleMessage, PresentedMessage};

/// External services the presentation model talks to
pub struct Collaborators {
    pub backend: Arc<dyn DebuggerBackend>,
    pub resources: Arc<dyn ResourceProvider>,
    pub settings: Arc<dyn SettingsStore>,
    /// Defaults to a [`BasicFormatter`] with the configured indent
    pub formatter: Option<Arc<dyn ScriptFormatter>>,
}

impl Collaborators {
    /// Backend only: no page resources, in-memory settings
    pub fn new(backend: Arc<dyn DebuggerBackend>) -> Self {
        Self {
            backend,
            resources: Arc::new(NoResources),
            settings: Arc::new(MemorySettings::new()),
            formatter: None,
        }
    }

    /// Like [`Collaborators::new`], with breakpoints persisted to the
    /// configured settings file when persistence is on
    pub fn from_config(backend: Arc<dyn DebuggerBackend>, config: &Config) -> Self {
        let settings: Arc<dyn SettingsStore> = match config.settings_path() {
            Some(path) if config.breakpoints.persist => Arc::new(FileSettings::new(path)),
            _ => Arc::new(MemorySettings::new()),
        };
        Self {
            settings,
            ..Self::new(backend)
        }
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ScriptFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

pub struct DebuggerPresentationModel {
    config: Config,
    backend: Arc<dyn DebuggerBackend>,
    settings: Arc<dyn SettingsStore>,
    registry: Mutex<SourceRegistry>,
    breakpoints: Mutex<BreakpointTable>,
    breakpoint_ops: tokio::sync::Mutex<()>,
    call_stack: Mutex<CallStack>,
    /// Every message received, kept for re-projection after a rebuild
    messages: Mutex<Vec<ConsoleMessage>>,
    /// Messages whose file has no mapping until its content loads
    unplaced_messages: Mutex<Vec<ConsoleMessage>>,
    /// `(epoch, file id)` of files a projection is waiting on
    awaited_loads: Mutex<HashSet<(u64, String)>>,
    events_tx: mpsc::UnboundedSender<PresentationEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<PresentationEvent>>>,
}

impl DebuggerPresentationModel {
    pub fn new(config: Config, collaborators: Collaborators) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let formatter: Arc<dyn ScriptFormatter> = match collaborators.formatter {
            Some(formatter) => formatter,
            None => Arc::new(BasicFormatter::new(config.formatter.indent)),
        };
        let loader = ContentLoader {
            backend: Arc::clone(&collaborators.backend),
            resources: collaborators.resources,
            formatter,
        };
        let registry = SourceRegistry::new(loader, events_tx.clone(), config.sources.reformat);

        Arc::new(Self {
            config,
            backend: collaborators.backend,
            settings: collaborators.settings,
            registry: Mutex::new(registry),
            breakpoints: Mutex::new(BreakpointTable::default()),
            breakpoint_ops: tokio::sync::Mutex::new(()),
            call_stack: Mutex::new(CallStack::default()),
            messages: Mutex::new(Vec::new()),
            unplaced_messages: Mutex::new(Vec::new()),
            awaited_loads: Mutex::new(HashSet::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<PresentationEvent>> {
        self.events_rx.lock().take()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn emit(&self, event: PresentationEvent) {
        let _ = self.events_tx.send(event);
    }

    fn epoch(&self) -> u64 {
        self.registry.lock().epoch()
    }

    fn file(&self, file_id: &str) -> Result<Arc<SourceFile>> {
        self.source_file(file_id)
            .ok_or_else(|| Error::SourceFileNotFound(file_id.to_string()))
    }

    /// Source file and its mapping, loading content if needed
    async fn file_with_mapping(&self, file_id: &str) -> Result<(Arc<SourceFile>, Arc<SourceMapping>)> {
        let file = self.file(file_id)?;
        let mapping = file.request_mapping().await?;
        Ok((file, mapping))
    }

    /// Apply one backend event
    #[tracing::instrument(skip(self))]
    pub async fn handle_backend_event(self: &Arc<Self>, event: BackendEvent) -> Result<()> {
        match event {
            BackendEvent::DebuggerWasEnabled => self.restore_breakpoints().await,
            BackendEvent::UnitParsed(unit) | BackendEvent::UnitFailedToParse(unit) => {
                self.unit_discovered(unit).await;
                Ok(())
            }
            BackendEvent::BreakpointResolved(record) => self.breakpoint_resolved(record).await,
            BackendEvent::DebuggerPaused { frames, details } => {
                self.debugger_paused(frames, details).await
            }
            BackendEvent::DebuggerResumed => {
                self.debugger_resumed();
                Ok(())
            }
            BackendEvent::Reset => {
                self.reset().await;
                Ok(())
            }
        }
    }

    // === Source files ===

    async fn unit_discovered(self: &Arc<Self>, unit: RawUnit) {
        let unit_id = unit.unit_id.clone();
        let file = self.registry.lock().on_unit_discovered(unit);
        tracing::debug!(unit = %unit_id, file = %file.id(), "Unit discovered");

        let _ops = self.breakpoint_ops.lock().await;
        self.refresh_breakpoints_locked().await;
    }

    pub fn source_file(&self, file_id: &str) -> Option<Arc<SourceFile>> {
        self.registry.lock().source_file(file_id)
    }

    pub fn source_files(&self) -> Vec<Arc<SourceFile>> {
        self.registry.lock().files()
    }

    pub async fn request_content(&self, file_id: &str) -> Result<SourceContent> {
        self.file(file_id)?.request_content().await
    }

    pub async fn request_mapping(&self, file_id: &str) -> Result<Arc<SourceMapping>> {
        self.file(file_id)?.request_mapping().await
    }

    /// A page resource finished loading; files waiting on it can load now
    pub fn resource_finished(&self, url: &str) {
        if let Some(file) = self.source_file(url) {
            tracing::debug!(url, "Resource finished loading");
            file.reload();
        }
    }

    pub fn reformat(&self) -> bool {
        self.registry.lock().reformat()
    }

    /// Flip between verbatim and pretty-printed presentation
    ///
    /// Every source file is rebuilt; console messages, breakpoints and the
    /// paused call stack are projected again onto the new files. Projections
    /// onto pretty-printed files land once their content has loaded.
    pub async fn toggle_reformat(self: &Arc<Self>) -> Result<bool> {
        let reformat = {
            let _ops = self.breakpoint_ops.lock().await;
            self.emit(PresentationEvent::Reset);
            let reformat = self.registry.lock().toggle_reformat();
            self.breakpoints.lock().clear_projections();
            self.unplaced_messages.lock().clear();
            tracing::info!(reformat, "Reformat mode toggled");
            self.refresh_breakpoints_locked().await;
            reformat
        };

        let messages = self.messages.lock().clone();
        for message in messages {
            self.present_message(message);
        }
        self.reproject_call_frames().await?;
        Ok(reformat)
    }

    async fn reset(&self) {
        let _ops = self.breakpoint_ops.lock().await;
        self.registry.lock().reset();
        self.breakpoints.lock().retain_url_records();
        self.messages.lock().clear();
        self.unplaced_messages.lock().clear();
        self.call_stack.lock().resume();
        tracing::info!("Presentation reset");
        self.emit(PresentationEvent::Reset);
    }

    /// Finish projections onto `file` once its content is loaded
    fn await_content(self: &Arc<Self>, file: &Arc<SourceFile>) {
        let key = (self.epoch(), file.id().to_string());
        if !self.awaited_loads.lock().insert(key.clone()) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(file = %file.id(), "No async runtime available to wait for content");
            self.awaited_loads.lock().remove(&key);
            return;
        };

        tracing::debug!(file = %file.id(), "Projection waits for content");
        let model = Arc::clone(self);
        let file = Arc::clone(file);
        runtime.spawn(async move {
            let loaded = file.request_mapping().await;
            model.awaited_loads.lock().remove(&key);
            match loaded {
                Ok(_) if model.epoch() == key.0 => model.content_arrived(&file).await,
                Ok(_) => {
                    tracing::trace!(file = %file.id(), "Content arrived for a rebuilt source file");
                }
                Err(e) => {
                    tracing::warn!(file = %file.id(), error = %e, "Projection abandoned, content did not load");
                }
            }
        });
    }

    async fn content_arrived(self: &Arc<Self>, file: &Arc<SourceFile>) {
        {
            let _ops = self.breakpoint_ops.lock().await;
            self.refresh_breakpoints_locked().await;
        }

        let waiting: Vec<ConsoleMessage> = {
            let mut unplaced = self.unplaced_messages.lock();
            let (waiting, rest) = std::mem::take(&mut *unplaced)
                .into_iter()
                .partition(|message| message.url.as_deref() == Some(file.id()));
            *unplaced = rest;
            waiting
        };
        for message in waiting {
            self.present_message(message);
        }
    }

    // === Console messages ===

    /// Record a console message and place it in its source file
    ///
    /// `None` when no source file has the message's URL, or when the file's
    /// content is still loading; in the latter case `ConsoleMessageAdded`
    /// fires once it is placed.
    pub fn add_console_message(self: &Arc<Self>, message: ConsoleMessage) -> Option<PresentedMessage> {
        self.messages.lock().push(message.clone());
        self.present_message(message)
    }

    fn present_message(self: &Arc<Self>, message: ConsoleMessage) -> Option<PresentedMessage> {
        let file = message.url.as_deref().and_then(|url| self.source_file(url))?;
        let Some(mapping) = file.ready_mapping() else {
            self.unplaced_messages.lock().push(message);
            self.await_content(&file);
            return None;
        };

        let location = mapping.script_location_to_source_location(message.line.saturating_sub(1), 0);
        let presented = PresentedMessage {
            file_id: file.id().to_string(),
            line: location.line,
            original: message,
        };
        file.push_message(presented.clone());
        self.emit(PresentationEvent::ConsoleMessageAdded(presented.clone()));
        Some(presented)
    }

    pub fn clear_console_messages(&self) {
        self.messages.lock().clear();
        self.unplaced_messages.lock().clear();
        for file in self.source_files() {
            file.clear_messages();
        }
        self.emit(PresentationEvent::ConsoleMessagesCleared);
    }

    // === Breakpoints ===

    /// Set a breakpoint on a presented line
    ///
    /// `Ok(None)` when the backend declined or the line already had one.
    #[tracing::instrument(skip(self, condition))]
    pub async fn set_breakpoint(
        self: &Arc<Self>,
        file_id: &str,
        line: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<PresentedBreakpoint>> {
        let (_, mapping) = self.file_with_mapping(file_id).await?;
        let _ops = self.breakpoint_ops.lock().await;
        self.set_breakpoint_locked(file_id, &mapping, line, condition, enabled)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_breakpoint(&self, file_id: &str, line: u32) -> Result<PresentedBreakpoint> {
        let _ops = self.breakpoint_ops.lock().await;
        self.remove_breakpoint_locked(file_id, line).await
    }

    /// Replace the breakpoint on `line` with one using new settings
    pub async fn update_breakpoint(
        self: &Arc<Self>,
        file_id: &str,
        line: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<PresentedBreakpoint>> {
        let (_, mapping) = self.file_with_mapping(file_id).await?;
        let _ops = self.breakpoint_ops.lock().await;
        self.remove_breakpoint_locked(file_id, line).await?;
        self.set_breakpoint_locked(file_id, &mapping, line, condition, enabled)
            .await
    }

    pub async fn set_breakpoint_enabled(
        self: &Arc<Self>,
        file_id: &str,
        line: u32,
        enabled: bool,
    ) -> Result<Option<PresentedBreakpoint>> {
        let (_, mapping) = self.file_with_mapping(file_id).await?;
        let _ops = self.breakpoint_ops.lock().await;
        let removed = self.remove_breakpoint_locked(file_id, line).await?;
        self.set_breakpoint_locked(file_id, &mapping, line, &removed.condition, enabled)
            .await
    }

    pub fn find_breakpoint(&self, file_id: &str, line: u32) -> Option<PresentedBreakpoint> {
        self.source_file(file_id)?.breakpoint_at(line)
    }

    pub fn breakpoints_for_file(&self, file_id: &str) -> Vec<PresentedBreakpoint> {
        self.source_file(file_id)
            .map(|file| file.breakpoints())
            .unwrap_or_default()
    }

    /// Text of the presented line a breakpoint sits on
    pub async fn breakpoint_snippet(&self, file_id: &str, line: u32) -> Result<String> {
        let file = self.file(file_id)?;
        if file.breakpoint_at(line).is_none() {
            return Err(Error::breakpoint_not_found(file_id, line));
        }
        let content = file.request_content().await?;
        let snippet = LineEndings::new(&content.text)
            .line_range(line)
            .map(|range| content.text[range].to_string())
            .unwrap_or_default();
        Ok(snippet)
    }

    /// Move breakpoints of `file_id` from `old_text` lines to `new_text` lines
    ///
    /// Breakpoints whose line cannot be re-anchored are dropped.
    pub async fn reanchor_after_edit(
        self: &Arc<Self>,
        file_id: &str,
        old_text: &str,
        new_text: &str,
    ) -> Result<()> {
        let (_, mapping) = self.file_with_mapping(file_id).await?;
        let _ops = self.breakpoint_ops.lock().await;
        self.reanchor_locked(file_id, &mapping, old_text, new_text)
            .await
    }

    async fn set_breakpoint_locked(
        self: &Arc<Self>,
        file_id: &str,
        mapping: &SourceMapping,
        line: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<PresentedBreakpoint>> {
        let location = mapping
            .source_location_to_script_location(line, 0)
            .ok_or_else(|| Error::UnresolvedLocation {
                file_id: file_id.to_string(),
                line,
            })?;
        let unit = self
            .registry
            .lock()
            .unit(&location.unit_id)
            .cloned()
            .ok_or_else(|| Error::UnitNotFound(location.unit_id.clone()))?;

        let record = match &unit.source_url {
            Some(url) => {
                self.backend
                    .set_breakpoint_by_url(url, location.line, location.column, condition, enabled)
                    .await?
            }
            None => {
                self.backend
                    .set_breakpoint_by_unit_id(
                        &unit.unit_id,
                        location.line,
                        location.column,
                        condition,
                        enabled,
                    )
                    .await?
            }
        };
        let Some(record) = record else {
            tracing::debug!(file = %file_id, line, "Backend declined breakpoint");
            return Ok(None);
        };

        self.breakpoints.lock().remember(record.clone());
        let projected = self.project_locked(record).await;
        self.save_breakpoints();
        Ok(projected)
    }

    async fn remove_breakpoint_locked(&self, file_id: &str, line: u32) -> Result<PresentedBreakpoint> {
        let file = self.file(file_id)?;
        let breakpoint = file
            .breakpoint_at(line)
            .ok_or_else(|| Error::breakpoint_not_found(file_id, line))?;

        self.unpresent(&breakpoint.id);
        self.breakpoints.lock().forget(&breakpoint.id);
        if let Err(e) = self.backend.remove_breakpoint(&breakpoint.id).await {
            tracing::warn!(id = %breakpoint.id, error = %e, "Backend failed to remove breakpoint");
        }
        self.save_breakpoints();
        Ok(breakpoint)
    }

    async fn reanchor_locked(
        self: &Arc<Self>,
        file_id: &str,
        mapping: &SourceMapping,
        old_text: &str,
        new_text: &str,
    ) -> Result<()> {
        let file = self.file(file_id)?;
        let diff = diff_text(old_text, new_text);
        let breakpoints = file.breakpoints();

        for breakpoint in &breakpoints {
            self.remove_breakpoint_locked(file_id, breakpoint.line).await?;
        }

        for breakpoint in breakpoints {
            let Some(line) = diff.reanchor(breakpoint.line as usize) else {
                tracing::debug!(file = %file_id, line = breakpoint.line, "Breakpoint line did not survive the edit");
                continue;
            };
            let result = self
                .set_breakpoint_locked(
                    file_id,
                    mapping,
                    line as u32,
                    &breakpoint.condition,
                    breakpoint.enabled,
                )
                .await;
            if let Err(e) = result {
                tracing::warn!(file = %file_id, line, error = %e, "Failed to re-create breakpoint");
            }
        }
        Ok(())
    }

    async fn breakpoint_resolved(self: &Arc<Self>, record: BackendBreakpoint) -> Result<()> {
        let _ops = self.breakpoint_ops.lock().await;
        if !self.breakpoints.lock().knows(&record.id) {
            tracing::debug!(id = %record.id, "Ignoring resolution of a breakpoint this session did not set");
            return Ok(());
        }
        tracing::debug!(id = %record.id, locations = record.locations.len(), "Breakpoint resolved");
        self.unpresent(&record.id);
        self.breakpoints.lock().remember(record.clone());
        self.project_locked(record).await;
        Ok(())
    }

    /// Project every known backend breakpoint that has no presented line yet
    async fn refresh_breakpoints_locked(self: &Arc<Self>) {
        let pending = self.breakpoints.lock().unprojected();
        for record in pending {
            self.project_locked(record).await;
        }
    }

    fn file_for_record(&self, record: &BackendBreakpoint) -> Option<Arc<SourceFile>> {
        let registry = self.registry.lock();
        let by_location = record
            .locations
            .first()
            .and_then(|location| registry.file_for_unit(&location.unit_id));
        if by_location.is_some() {
            return by_location;
        }
        match (&record.url, &record.unit_id) {
            (Some(url), _) => registry.source_file(url),
            (None, Some(unit_id)) => registry.file_for_unit(unit_id),
            (None, None) => None,
        }
    }

    /// Place a backend breakpoint on its presented line
    ///
    /// A record whose file has no mapping yet stays unprojected until the
    /// file's content loads. When the line is already taken the new
    /// breakpoint is removed from the backend and forgotten.
    async fn project_locked(self: &Arc<Self>, record: BackendBreakpoint) -> Option<PresentedBreakpoint> {
        let Some(file) = self.file_for_record(&record) else {
            tracing::trace!(id = %record.id, "No source file for breakpoint yet");
            return None;
        };
        let Some(mapping) = file.ready_mapping() else {
            self.await_content(&file);
            return None;
        };

        let (line, column) = record.anchor();
        let location = mapping.script_location_to_source_location(line, column);
        let breakpoint = PresentedBreakpoint::from_record(&record, file.id(), file.url(), location.line);

        if !file.insert_breakpoint(breakpoint.clone()) {
            tracing::debug!(
                id = %record.id,
                file = %file.id(),
                line = location.line,
                "Line already has a breakpoint, removing the new one"
            );
            self.breakpoints.lock().forget(&record.id);
            if let Err(e) = self.backend.remove_breakpoint(&record.id).await {
                tracing::warn!(id = %record.id, error = %e, "Backend failed to remove breakpoint");
            }
            self.save_breakpoints();
            return None;
        }

        self.breakpoints
            .lock()
            .project(&record.id, file.id(), location.line);
        self.emit(PresentationEvent::BreakpointAdded(breakpoint.clone()));
        Some(breakpoint)
    }

    /// Take a breakpoint off its presented line
    fn unpresent(&self, id: &str) -> Option<PresentedBreakpoint> {
        let (file_id, line) = self.breakpoints.lock().unproject(id)?;
        let file = self.source_file(&file_id)?;
        if file.breakpoint_at(line)?.id != id {
            return None;
        }
        let breakpoint = file.take_breakpoint(line)?;
        self.emit(PresentationEvent::BreakpointRemoved(breakpoint.clone()));
        Some(breakpoint)
    }

    async fn restore_breakpoints(self: &Arc<Self>) -> Result<()> {
        if !self.config.breakpoints.persist {
            return Ok(());
        }
        let saved = match self.settings.load_breakpoints() {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load saved breakpoints");
                return Ok(());
            }
        };
        tracing::info!(count = saved.len(), "Restoring breakpoints");

        let _ops = self.breakpoint_ops.lock().await;
        for breakpoint in saved {
            let result = self
                .backend
                .set_breakpoint_by_url(
                    &breakpoint.url,
                    breakpoint.line_number,
                    breakpoint.column_number,
                    &breakpoint.condition,
                    breakpoint.enabled,
                )
                .await;
            match result {
                Ok(Some(record)) => {
                    self.breakpoints.lock().remember(record.clone());
                    self.project_locked(record).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(url = %breakpoint.url, line = breakpoint.line_number, error = %e, "Failed to restore breakpoint");
                }
            }
        }
        Ok(())
    }

    fn save_breakpoints(&self) {
        if !self.config.breakpoints.persist {
            return;
        }
        let persisted = self.breakpoints.lock().persisted();
        if let Err(e) = self.settings.save_breakpoints(&persisted) {
            tracing::warn!(error = %e, "Failed to save breakpoints");
        }
    }

    // === Live edit ===

    /// Whether `file_id` may be edited in the running program
    pub fn can_edit_script_source(&self, file_id: &str) -> bool {
        if !self.config.sources.can_edit_script_source {
            return false;
        }
        let Some(file) = self.source_file(file_id) else {
            return false;
        };
        file.kind() == SourceFileKind::Plain
            && file
                .primary_unit()
                .map(|unit| unit.line_offset == 0 && unit.column_offset == 0)
                .unwrap_or(false)
    }

    /// Replace a file's script in the running program
    ///
    /// Breakpoints follow their lines into the new text, the file content is
    /// reloaded and a paused call stack is projected again.
    #[tracing::instrument(skip(self, new_text))]
    pub async fn edit_script_source(self: &Arc<Self>, file_id: &str, new_text: &str) -> Result<()> {
        if !self.can_edit_script_source(file_id) {
            return Err(Error::EditNotAllowed(file_id.to_string()));
        }
        let (file, mapping) = self.file_with_mapping(file_id).await?;
        let unit = file
            .primary_unit()
            .ok_or_else(|| Error::UnitNotFound(file_id.to_string()))?;
        let old_text = file.request_content().await?.text;

        {
            let _ops = self.breakpoint_ops.lock().await;
            if let Err(e) = self.backend.edit_unit_source(&unit.unit_id, new_text).await {
                tracing::warn!(file = %file_id, error = %e, "Live edit rejected");
                return Err(Error::EditRejected {
                    file_id: file_id.to_string(),
                    reason: e.to_string(),
                });
            }
            self.reanchor_locked(file_id, &mapping, &old_text, new_text)
                .await?;
            file.reload();
        }

        tracing::info!(file = %file_id, "Script source edited");
        self.reproject_call_frames().await
    }

    /// Run until the presented `line` of `file_id`
    pub async fn continue_to_line(&self, file_id: &str, line: u32) -> Result<()> {
        if !self.is_paused() {
            return Err(Error::NotPaused);
        }
        let (_, mapping) = self.file_with_mapping(file_id).await?;
        let location = mapping
            .source_location_to_script_location(line, 0)
            .ok_or_else(|| Error::UnresolvedLocation {
                file_id: file_id.to_string(),
                line,
            })?;
        self.backend
            .continue_to_location(&RawLocation {
                unit_id: location.unit_id,
                line: location.line,
                column: location.column,
            })
            .await
    }

    // === Call stack ===

    async fn debugger_paused(
        &self,
        frames: Vec<BackendCallFrame>,
        details: PausedDetails,
    ) -> Result<()> {
        let presented: Vec<PresentedCallFrame> = {
            let registry = self.registry.lock();
            frames
                .into_iter()
                .enumerate()
                .map(|(index, frame)| PresentedCallFrame {
                    index,
                    file_id: registry
                        .file_for_unit(&frame.unit_id)
                        .map(|file| file.id().to_string()),
                    frame,
                })
                .collect()
        };
        tracing::info!(frames = presented.len(), reason = %details.reason, "Debugger paused");

        let selected = self
            .call_stack
            .lock()
            .pause(presented.clone(), details.clone());
        let has_frames = !presented.is_empty();
        self.emit(PresentationEvent::DebuggerPaused {
            frames: presented,
            details,
        });

        if has_frames {
            self.select_call_frame(selected).await?;
        }
        Ok(())
    }

    fn debugger_resumed(&self) {
        self.call_stack.lock().resume();
        tracing::debug!("Debugger resumed");
        self.emit(PresentationEvent::DebuggerResumed);
    }

    async fn reproject_call_frames(&self) -> Result<()> {
        let snapshot = self.call_stack.lock().snapshot();
        match snapshot {
            Some((frames, details)) => self.debugger_paused(frames, details).await,
            None => Ok(()),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.call_stack.lock().is_paused()
    }

    pub fn call_frames(&self) -> Vec<PresentedCallFrame> {
        self.call_stack.lock().frames().to_vec()
    }

    pub fn selected_call_frame(&self) -> Option<PresentedCallFrame> {
        self.call_stack.lock().selected().cloned()
    }

    /// Make frame `index` current
    ///
    /// Its source file is asked to materialize content so the paused line
    /// can be shown, and the backend switches its evaluation context.
    pub async fn select_call_frame(&self, index: usize) -> Result<PresentedCallFrame> {
        let frame = self.call_stack.lock().select(index)?;
        if let Some(file) = frame.file_id.as_deref().and_then(|id| self.source_file(id)) {
            file.force_load_content(&frame.frame.unit_id);
        }
        if let Err(e) = self.backend.select_call_frame(&frame.frame.id).await {
            tracing::warn!(frame = %frame.frame.id, error = %e, "Backend failed to select call frame");
        }
        self.emit(PresentationEvent::CallFrameSelected(frame.clone()));
        Ok(frame)
    }

    /// Presented location of frame `index`; raw coordinates for internal
    /// scripts
    pub async fn call_frame_source_location(&self, index: usize) -> Result<FrameLocation> {
        let frame = self.call_stack.lock().frame(index)?.clone();
        let Some(file) = frame.file_id.as_deref().and_then(|id| self.source_file(id)) else {
            return Ok(FrameLocation {
                file_id: None,
                line: frame.frame.line,
                column: frame.frame.column,
            });
        };

        let mapping = file.request_mapping().await?;
        let location = mapping.script_location_to_source_location(frame.frame.line, frame.frame.column);
        Ok(FrameLocation {
            file_id: Some(file.id().to_string()),
            line: location.line,
            column: location.column,
        })
    }

    pub async fn evaluate_in_frame(&self, index: usize, expression: &str) -> Result<Value> {
        let frame_id = self.call_stack.lock().frame(index)?.frame.id.clone();
        self.backend.evaluate_in_frame(&frame_id, expression).await
    }
}
