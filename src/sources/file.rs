//! Source file aggregate
//!
//! A [`SourceFile`] groups every raw unit that shares a file id, loads the
//! presented content at most once per invalidation, and owns the coordinate
//! mapping plus the breakpoints and console messages anchored to it.
//!
//! Content loading runs on a spawned task. Callers that ask while a load is
//! in flight queue a oneshot waiter and are all answered, in order, by that
//! single load.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use futures_util::future::try_join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::backend::{DebuggerBackend, RawUnit, ResourceKind, ResourceProvider, UnitId, WorldType};
use crate::common::{Error, Result};
use crate::events::PresentationEvent;
use crate::mapping::{DirectMapping, FormattedMapping, SourceLocation, SourceMapping};
use crate::presentation::{PresentedBreakpoint, PresentedMessage};

use super::formatter::{FormattedContent, ScriptFormatter, HTML_MIME, JAVASCRIPT_MIME};

pub const SCRIPT_OPEN_TAG: &str = "<script>";
pub const SCRIPT_CLOSE_TAG: &str = "</script>";

/// Presented content of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContent {
    pub mime_type: String,
    pub text: String,
}

/// Presentation strategy of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFileKind {
    /// Verbatim content with a direct mapping
    Plain,
    /// Pretty-printed content with a formatted mapping
    Formatted,
}

/// Collaborators a source file loads its content through
#[derive(Clone)]
pub struct ContentLoader {
    pub backend: Arc<dyn DebuggerBackend>,
    pub resources: Arc<dyn ResourceProvider>,
    pub formatter: Arc<dyn ScriptFormatter>,
}

#[derive(Debug)]
enum FetchPlan {
    Resource { url: String, kind: ResourceKind },
    Unit(UnitId),
    Concatenate(Vec<RawUnit>),
}

struct LoadedContent {
    content: SourceContent,
    formatted: Option<FormattedContent>,
}

/// Content together with the mapping built from that same load
type Loaded = (SourceContent, Option<Arc<SourceMapping>>);

type ContentWaiter = oneshot::Sender<std::result::Result<Loaded, String>>;

#[derive(Default)]
struct SourceFileState {
    /// Sorted by embedding position
    units: Vec<RawUnit>,
    content: Option<SourceContent>,
    mapping: Option<Arc<SourceMapping>>,
    requested: bool,
    reload_pending: bool,
    waiters: VecDeque<ContentWaiter>,
    force_concatenate: bool,
    concatenated: HashSet<UnitId>,
    breakpoints: BTreeMap<u32, PresentedBreakpoint>,
    messages: Vec<PresentedMessage>,
}

/// Logical source file made of one or more raw units
pub struct SourceFile {
    id: String,
    url: Option<String>,
    kind: SourceFileKind,
    is_extension_script: bool,
    loader: ContentLoader,
    events: mpsc::UnboundedSender<PresentationEvent>,
    state: Mutex<SourceFileState>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl SourceFile {
    pub fn new(
        unit: RawUnit,
        kind: SourceFileKind,
        loader: ContentLoader,
        events: mpsc::UnboundedSender<PresentationEvent>,
    ) -> Arc<Self> {
        let file = Self {
            id: unit.file_id().to_string(),
            url: unit.source_url.clone(),
            kind,
            is_extension_script: unit.world == WorldType::Extensions,
            loader,
            events,
            state: Mutex::new(SourceFileState {
                units: vec![unit],
                ..Default::default()
            }),
        };
        Arc::new(file)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn kind(&self) -> SourceFileKind {
        self.kind
    }

    pub fn is_extension_script(&self) -> bool {
        self.is_extension_script
    }

    /// Units in embedding order
    pub fn units(&self) -> Vec<RawUnit> {
        self.state.lock().units.clone()
    }

    /// The unit embedded first; the one live edits apply to
    pub fn primary_unit(&self) -> Option<RawUnit> {
        self.state.lock().units.first().cloned()
    }

    pub fn add_script(&self, unit: RawUnit) {
        let mut state = self.state.lock();
        if state.units.iter().any(|known| known.unit_id == unit.unit_id) {
            return;
        }
        state.units.push(unit);
        state.units.sort_by_key(RawUnit::embedding);
        if let Some(mapping) = state.mapping.take() {
            let rebuilt = mapping.with_units(&state.units);
            state.mapping = Some(Arc::new(rebuilt));
        }
    }

    /// Content if it is currently materialized
    pub fn content(&self) -> Option<SourceContent> {
        self.state.lock().content.clone()
    }

    pub fn is_content_loaded(&self) -> bool {
        self.state.lock().content.is_some()
    }

    /// Presented content, loading it if needed
    ///
    /// Concurrent callers share one load. A failed load is reported to every
    /// waiter and not cached.
    pub async fn request_content(self: &Arc<Self>) -> Result<SourceContent> {
        let (content, _) = self.request_loaded().await?;
        Ok(content)
    }

    async fn request_loaded(self: &Arc<Self>) -> Result<Loaded> {
        let receiver = {
            let mut state = self.state.lock();
            if let Some(content) = &state.content {
                return Ok((content.clone(), state.mapping.clone()));
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            self.start_fetch(&mut state);
            receiver
        };

        match receiver.await {
            Ok(Ok(loaded)) => Ok(loaded),
            Ok(Err(reason)) => Err(Error::content_unavailable(&self.id, reason)),
            Err(_) => Err(Error::ContentDropped(self.id.clone())),
        }
    }

    /// Coordinate mapping for this file, cached until the next reload
    ///
    /// A formatted mapping is the one built by the load that answered this
    /// request, even if a deferred reload discards it right after.
    pub async fn request_mapping(self: &Arc<Self>) -> Result<Arc<SourceMapping>> {
        if let Some(mapping) = self.ready_mapping() {
            return Ok(mapping);
        }

        let (_, mapping) = self.request_loaded().await?;
        mapping.ok_or_else(|| Error::MappingUnavailable(self.id.clone()))
    }

    /// Mapping if it can be had without loading content
    ///
    /// Always available for plain files; formatted files have one only while
    /// their content is loaded.
    pub fn ready_mapping(&self) -> Option<Arc<SourceMapping>> {
        let mut state = self.state.lock();
        if let Some(mapping) = &state.mapping {
            return Some(Arc::clone(mapping));
        }
        match self.kind {
            SourceFileKind::Plain => {
                let mapping = Arc::new(SourceMapping::Direct(DirectMapping::new(&state.units)));
                state.mapping = Some(Arc::clone(&mapping));
                Some(mapping)
            }
            SourceFileKind::Formatted => None,
        }
    }

    /// Invalidate the content
    ///
    /// Loaded content is dropped and `SourceFileChanged` fires. A reload during
    /// an in-flight load is deferred until that load completes and then
    /// triggers exactly one fresh load.
    pub fn reload(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.content.is_some() {
            state.content = None;
            state.mapping = None;
            drop(state);
            tracing::debug!(file = %self.id, "Content invalidated");
            self.notify_changed();
        } else if state.requested {
            tracing::debug!(file = %self.id, "Reload deferred until the current load completes");
            state.reload_pending = true;
        } else if !state.waiters.is_empty() {
            self.start_fetch(&mut state);
        }
    }

    /// Make sure content materializes so a paused frame inside `unit_id` can
    /// be shown
    ///
    /// While the backing document is still loading, the units parsed so far
    /// are concatenated instead of waiting for it.
    pub fn force_load_content(self: &Arc<Self>, unit_id: &str) {
        if self.has_pending_resource() {
            {
                let mut state = self.state.lock();
                if state.concatenated.contains(unit_id) {
                    return;
                }
                let ids: Vec<UnitId> = state.units.iter().map(|u| u.unit_id.clone()).collect();
                state.concatenated.extend(ids);
                state.force_concatenate = true;
            }
            tracing::debug!(file = %self.id, unit = %unit_id, "Concatenating units of a loading document");
            self.reload();
        }

        let mut state = self.state.lock();
        if state.content.is_none() {
            self.start_fetch(&mut state);
        }
    }

    fn has_pending_resource(&self) -> bool {
        self.url
            .as_deref()
            .and_then(|url| self.loader.resources.resource(url))
            .map(|info| !info.finished)
            .unwrap_or(false)
    }

    fn notify_changed(&self) {
        let _ = self.events.send(PresentationEvent::SourceFileChanged {
            file_id: self.id.clone(),
        });
    }

    fn plan_fetch(&self, state: &SourceFileState) -> Option<FetchPlan> {
        let resource = self
            .url
            .as_deref()
            .and_then(|url| self.loader.resources.resource(url).map(|info| (url, info)));

        match resource {
            Some((url, info)) if info.finished => Some(FetchPlan::Resource {
                url: url.to_string(),
                kind: info.kind,
            }),
            Some(_) if state.force_concatenate => {
                Some(FetchPlan::Concatenate(state.units.clone()))
            }
            Some(_) => None,
            None => match state.units.as_slice() {
                [] => None,
                [single] => Some(FetchPlan::Unit(single.unit_id.clone())),
                units => Some(FetchPlan::Concatenate(units.to_vec())),
            },
        }
    }

    fn start_fetch(self: &Arc<Self>, state: &mut SourceFileState) {
        if state.requested {
            return;
        }
        let Some(plan) = self.plan_fetch(state) else {
            tracing::debug!(file = %self.id, "Waiting for the document resource to finish loading");
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(file = %self.id, "No async runtime available to load content");
            return;
        };

        tracing::debug!(file = %self.id, ?plan, "Loading content");
        state.requested = true;
        let file = Arc::clone(self);
        runtime.spawn(async move {
            let result = file.load(plan).await;
            file.did_load_content(result);
        });
    }

    async fn load(&self, plan: FetchPlan) -> Result<LoadedContent> {
        let (mime_type, text) = match plan {
            FetchPlan::Resource { url, kind } => {
                let text = self.loader.resources.fetch_resource_content(&url).await?;
                match kind {
                    ResourceKind::Script => (JAVASCRIPT_MIME, text),
                    // Scripts reach the VM with "\n" line endings; the document
                    // keeps its original ones.
                    ResourceKind::Document => (HTML_MIME, text.replace("\r\n", "\n")),
                }
            }
            FetchPlan::Unit(unit_id) => {
                let text = self.loader.backend.fetch_unit_source(&unit_id).await?;
                (JAVASCRIPT_MIME, text)
            }
            FetchPlan::Concatenate(units) => {
                let backend = &self.loader.backend;
                let sources =
                    try_join_all(units.iter().map(|unit| backend.fetch_unit_source(&unit.unit_id)))
                        .await?;
                let pairs: Vec<(RawUnit, String)> = units.into_iter().zip(sources).collect();
                (HTML_MIME, concatenate_units(&pairs).text)
            }
        };

        let formatted = match self.kind {
            SourceFileKind::Formatted => Some(self.loader.formatter.format(mime_type, &text)),
            SourceFileKind::Plain => None,
        };

        Ok(LoadedContent {
            content: SourceContent {
                mime_type: mime_type.to_string(),
                text,
            },
            formatted,
        })
    }

    fn did_load_content(self: &Arc<Self>, result: Result<LoadedContent>) {
        let (waiters, outcome, reload) = {
            let mut state = self.state.lock();
            state.requested = false;

            let outcome = match result {
                Ok(loaded) => {
                    let content = match loaded.formatted {
                        Some(formatted) => {
                            let mapping = FormattedMapping::new(
                                &state.units,
                                &loaded.content.text,
                                &formatted.text,
                                formatted.mapping,
                            );
                            state.mapping = Some(Arc::new(SourceMapping::Formatted(mapping)));
                            SourceContent {
                                mime_type: loaded.content.mime_type,
                                text: formatted.text,
                            }
                        }
                        None => loaded.content,
                    };
                    state.content = Some(content.clone());
                    Ok((content, state.mapping.clone()))
                }
                Err(e) => {
                    tracing::warn!(file = %self.id, error = %e, code = e.code(), "Failed to load content");
                    Err(e.to_string())
                }
            };

            (
                std::mem::take(&mut state.waiters),
                outcome,
                std::mem::take(&mut state.reload_pending),
            )
        };

        tracing::trace!(file = %self.id, waiters = waiters.len(), "Content load finished");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        if reload {
            self.refetch();
        }
    }

    fn refetch(self: &Arc<Self>) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.content.take().is_some();
            state.mapping = None;
            self.start_fetch(&mut state);
            changed
        };
        if changed {
            self.notify_changed();
        }
    }

    // === Breakpoints anchored to presented lines ===

    pub fn breakpoint_at(&self, line: u32) -> Option<PresentedBreakpoint> {
        self.state.lock().breakpoints.get(&line).cloned()
    }

    /// Breakpoints ordered by presented line
    pub fn breakpoints(&self) -> Vec<PresentedBreakpoint> {
        self.state.lock().breakpoints.values().cloned().collect()
    }

    /// Anchor a breakpoint; `false` when its line is already taken
    pub(crate) fn insert_breakpoint(&self, breakpoint: PresentedBreakpoint) -> bool {
        let mut state = self.state.lock();
        if state.breakpoints.contains_key(&breakpoint.line) {
            return false;
        }
        state.breakpoints.insert(breakpoint.line, breakpoint);
        true
    }

    pub(crate) fn take_breakpoint(&self, line: u32) -> Option<PresentedBreakpoint> {
        self.state.lock().breakpoints.remove(&line)
    }

    // === Console messages ===

    pub fn messages(&self) -> Vec<PresentedMessage> {
        self.state.lock().messages.clone()
    }

    pub(crate) fn push_message(&self, message: PresentedMessage) {
        self.state.lock().messages.push(message);
    }

    pub(crate) fn clear_messages(&self) {
        self.state.lock().messages.clear();
    }
}

/// Presented range occupied by one unit in a concatenated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRange {
    pub unit_id: UnitId,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

/// A document assembled from inline units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concatenation {
    pub text: String,
    pub ranges: Vec<UnitRange>,
}

struct ConcatenationBuilder {
    text: String,
    line: u32,
    column: u32,
}

impl ConcatenationBuilder {
    fn position(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        match chunk.rfind('\n') {
            Some(last) => {
                self.line += chunk.matches('\n').count() as u32;
                self.column = (chunk.len() - last - 1) as u32;
            }
            None => self.column += chunk.len() as u32,
        }
    }
}

/// Lay units out at their embedding offsets inside one document
///
/// Gaps are padded with newlines up to each unit's line offset, then with
/// spaces so that the unit text starts at its column offset once the
/// `<script>` opener is in place. Units are taken in embedding order.
pub fn concatenate_units(units: &[(RawUnit, String)]) -> Concatenation {
    let mut sorted: Vec<&(RawUnit, String)> = units.iter().collect();
    sorted.sort_by_key(|(unit, _)| unit.embedding());

    let mut builder = ConcatenationBuilder {
        text: String::new(),
        line: 0,
        column: 0,
    };
    let mut ranges = Vec::with_capacity(sorted.len());
    let opener_width = SCRIPT_OPEN_TAG.len() as u32;

    for (unit, source) in sorted {
        while builder.line < unit.line_offset {
            builder.append("\n");
        }
        while builder.column + opener_width < unit.column_offset {
            builder.append(" ");
        }

        builder.append(SCRIPT_OPEN_TAG);
        let start = builder.position();
        builder.append(source);
        ranges.push(UnitRange {
            unit_id: unit.unit_id.clone(),
            start,
            end: builder.position(),
        });
        builder.append(SCRIPT_CLOSE_TAG);
    }

    Concatenation {
        text: builder.text,
        ranges,
    }
}
