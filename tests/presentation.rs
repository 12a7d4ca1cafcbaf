//! End-to-end tests for the presentation model
//!
//! A scripted in-memory backend plays the debugger; each test feeds backend
//! events into the model and checks the projected state and the events it
//! publishes.

use std::sync::Arc;
use std::time::Duration;

use inspector::backend::{
    BackendBreakpoint, BackendCallFrame, BackendEvent, PausedDetails, RawLocation, RawUnit,
};
use inspector::common::config::Config;
use inspector::mapping::MappingKind;
use inspector::presentation::{ConsoleMessage, FrameLocation, MessageLevel};
use inspector::settings::{MemorySettings, PersistedBreakpoint, SettingsStore};
use inspector::sources::{SourceFileKind, HTML_MIME};
use inspector::testing::{settle, ScriptedBackend, StaticResources};
use inspector::{Collaborators, DebuggerPresentationModel, Error, PresentationEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Model wired to a scripted backend
struct Harness {
    backend: Arc<ScriptedBackend>,
    model: Arc<DebuggerPresentationModel>,
    events: UnboundedReceiver<PresentationEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let backend = Arc::new(ScriptedBackend::new());
        Self::build(config, Collaborators::new(backend.clone()), backend)
    }

    fn editable() -> Self {
        let mut config = Config::default();
        config.sources.can_edit_script_source = true;
        Self::with_config(config)
    }

    fn build(config: Config, collaborators: Collaborators, backend: Arc<ScriptedBackend>) -> Self {
        let model = DebuggerPresentationModel::new(config, collaborators);
        let events = model
            .take_event_receiver()
            .expect("event receiver taken once");
        Self {
            backend,
            model,
            events,
        }
    }

    async fn parse(&self, unit: RawUnit, source: &str) {
        self.backend.add_source(&unit.unit_id, source);
        self.backend.register_unit(&unit);
        self.model
            .handle_backend_event(BackendEvent::UnitParsed(unit))
            .await
            .unwrap();
    }

    async fn pause(&self, frames: Vec<BackendCallFrame>) {
        self.model
            .handle_backend_event(BackendEvent::DebuggerPaused {
                frames,
                details: PausedDetails {
                    reason: "breakpoint".to_string(),
                    data: None,
                },
            })
            .await
            .unwrap();
    }

    fn drain(&mut self) -> Vec<PresentationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn lines(&self, file_id: &str) -> Vec<u32> {
        self.model
            .breakpoints_for_file(file_id)
            .into_iter()
            .map(|bp| bp.line)
            .collect()
    }
}

fn frame(id: &str, unit_id: &str, line: u32) -> BackendCallFrame {
    BackendCallFrame {
        id: id.to_string(),
        function_name: format!("fn_{id}"),
        unit_id: unit_id.to_string(),
        line,
        column: 0,
        frame_type: "function".to_string(),
        scope_chain: Vec::new(),
    }
}

fn count_added(events: &[PresentationEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::BreakpointAdded(_)))
        .count()
}

fn count_removed(events: &[PresentationEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::BreakpointRemoved(_)))
        .count()
}

// ============================================================================
// Source files
// ============================================================================

#[tokio::test]
async fn test_unit_discovery_announces_source_file() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();").await;
    h.parse(RawUnit::new("u2"), "eval();").await;

    let added: Vec<String> = h
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            PresentationEvent::SourceFileAdded { file_id } => Some(file_id),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["app.js".to_string(), "u2".to_string()]);

    let content = h.model.request_content("app.js").await.unwrap();
    assert_eq!(content.text, "a();");
    assert!(matches!(
        h.model.request_content("missing.js").await,
        Err(Error::SourceFileNotFound(_))
    ));
}

#[tokio::test]
async fn test_concatenated_units_resolve_to_their_owner() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("page.html").at(0, 0), "one();").await;
    h.parse(RawUnit::new("u2").with_url("page.html").at(5, 0), "two();\ntwo_b();").await;
    h.parse(
        RawUnit::new("u3").with_url("page.html").at(10, 0),
        "three();\nthree_b();\nthree_c();",
    )
    .await;

    let content = h.model.request_content("page.html").await.unwrap();
    assert_eq!(content.mime_type, HTML_MIME);
    let lines: Vec<&str> = content.text.split('\n').collect();
    let third = lines.iter().position(|l| l.contains("three();")).unwrap();
    assert!(third >= 10);
    assert_eq!(lines[5], "<script>two();");

    let mapping = h.model.request_mapping("page.html").await.unwrap();
    assert_eq!(mapping.kind(), MappingKind::Direct);
    for line in 10..14 {
        let owner = mapping.source_location_to_script_location(line, 0).unwrap();
        assert_eq!(owner.unit_id, "u3", "line {line}");
    }
    let owner = mapping.source_location_to_script_location(7, 0).unwrap();
    assert_eq!(owner.unit_id, "u2");

    let bp = h.model.set_breakpoint("page.html", 11, "", true).await.unwrap().unwrap();
    assert_eq!(bp.line, 11);
    assert!(bp.resolved);
    let record = &h.backend.breakpoints()[0];
    assert_eq!(record.url.as_deref(), Some("page.html"));
    assert_eq!(record.locations[0].unit_id, "u3");
}

#[tokio::test]
async fn test_selecting_frame_in_loading_document_concatenates() {
    let backend = Arc::new(ScriptedBackend::new());
    let resources = Arc::new(StaticResources::new());
    resources.add_document(
        "page.html",
        "<html>\r\n\r\n<script>x();</script>\r\n</html>",
        false,
    );
    let collaborators = Collaborators::new(backend.clone()).with_resources(resources.clone());
    let mut h = Harness::build(Config::default(), collaborators, backend);

    h.parse(RawUnit::new("u1").with_url("page.html").at(2, 8), "x();").await;
    h.pause(vec![frame("f0", "u1", 2)]).await;
    settle().await;

    let file = h.model.source_file("page.html").unwrap();
    assert_eq!(
        file.content().map(|c| c.text),
        Some("\n\n<script>x();</script>".to_string())
    );
    h.drain();

    resources.finish("page.html");
    h.model.resource_finished("page.html");
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, PresentationEvent::SourceFileChanged { file_id } if file_id == "page.html")));

    let content = h.model.request_content("page.html").await.unwrap();
    assert_eq!(content.text, "<html>\n\n<script>x();</script>\n</html>");
    assert_eq!(resources.fetch_count("page.html"), 1);
}

// ============================================================================
// Breakpoints
// ============================================================================

#[tokio::test]
async fn test_one_breakpoint_per_presented_line() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    h.drain();

    let first = h.model.set_breakpoint("app.js", 1, "", true).await.unwrap().unwrap();
    let second = h.model.set_breakpoint("app.js", 1, "x > 1", true).await.unwrap();

    assert!(second.is_none());
    assert_eq!(h.model.breakpoints_for_file("app.js"), vec![first.clone()]);
    assert_eq!(h.backend.breakpoints().len(), 1);
    assert_eq!(h.backend.removed_breakpoints(), vec!["2".to_string()]);
    assert_eq!(count_added(&h.drain()), 1);
    assert_eq!(h.model.find_breakpoint("app.js", 1), Some(first));
}

#[tokio::test]
async fn test_breakpoint_by_unit_id_for_unnamed_script() {
    let h = Harness::new();
    h.parse(RawUnit::new("42"), "a();\nb();").await;

    let bp = h.model.set_breakpoint("42", 1, "", true).await.unwrap().unwrap();
    assert_eq!(bp.url, None);
    let record = &h.backend.breakpoints()[0];
    assert_eq!(record.unit_id.as_deref(), Some("42"));
    assert!(record.url.is_none());
}

#[tokio::test]
async fn test_declined_breakpoint_is_not_presented() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();").await;
    h.drain();
    h.backend.decline_breakpoints(true);

    assert!(h.model.set_breakpoint("app.js", 0, "", true).await.unwrap().is_none());
    assert!(h.lines("app.js").is_empty());
    assert_eq!(count_added(&h.drain()), 0);
}

#[tokio::test]
async fn test_remove_update_and_toggle_enabled() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    h.model.set_breakpoint("app.js", 2, "i == 3", true).await.unwrap();
    h.drain();

    let disabled = h.model.set_breakpoint_enabled("app.js", 2, false).await.unwrap().unwrap();
    assert!(!disabled.enabled);
    assert_eq!(disabled.condition, "i == 3");
    let events = h.drain();
    assert_eq!((count_removed(&events), count_added(&events)), (1, 1));

    let updated = h
        .model
        .update_breakpoint("app.js", 2, "i == 4", true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.condition, "i == 4");
    assert!(updated.enabled);

    let removed = h.model.remove_breakpoint("app.js", 2).await.unwrap();
    assert_eq!(removed.id, updated.id);
    assert!(h.lines("app.js").is_empty());
    assert!(h.backend.breakpoints().is_empty());

    assert!(matches!(
        h.model.remove_breakpoint("app.js", 2).await,
        Err(Error::BreakpointNotFound { line: 2, .. })
    ));
}

#[tokio::test]
async fn test_breakpoint_snippet_is_presented_line_text() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\n  b();\nc();").await;
    h.model.set_breakpoint("app.js", 1, "", true).await.unwrap();

    assert_eq!(h.model.breakpoint_snippet("app.js", 1).await.unwrap(), "  b();");
    assert!(h.model.breakpoint_snippet("app.js", 0).await.is_err());
}

#[tokio::test]
async fn test_resolved_breakpoint_moves_to_concrete_line() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\n\nb();").await;
    let bp = h.model.set_breakpoint("app.js", 1, "", true).await.unwrap().unwrap();
    h.drain();

    let record = BackendBreakpoint {
        id: bp.id.clone(),
        url: Some("app.js".to_string()),
        unit_id: None,
        line: 1,
        column: 0,
        condition: String::new(),
        enabled: true,
        locations: vec![RawLocation {
            unit_id: "u1".to_string(),
            line: 2,
            column: 0,
        }],
    };
    h.model
        .handle_backend_event(BackendEvent::BreakpointResolved(record))
        .await
        .unwrap();

    assert_eq!(h.lines("app.js"), vec![2]);
    assert!(h.model.find_breakpoint("app.js", 2).unwrap().resolved);
    let events = h.drain();
    assert_eq!((count_removed(&events), count_added(&events)), (1, 1));
}

fn resolution(id: &str, unit_id: &str, line: u32) -> BackendBreakpoint {
    BackendBreakpoint {
        id: id.to_string(),
        url: Some("app.js".to_string()),
        unit_id: None,
        line,
        column: 0,
        condition: String::new(),
        enabled: true,
        locations: vec![RawLocation {
            unit_id: unit_id.to_string(),
            line,
            column: 0,
        }],
    }
}

#[tokio::test]
async fn test_resolution_onto_taken_line_removes_breakpoint() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a\nb\nc").await;
    let first = h.model.set_breakpoint("app.js", 1, "", true).await.unwrap().unwrap();
    let second = h.model.set_breakpoint("app.js", 2, "", true).await.unwrap().unwrap();
    h.drain();

    h.model
        .handle_backend_event(BackendEvent::BreakpointResolved(resolution(&second.id, "u1", 1)))
        .await
        .unwrap();

    assert_eq!(h.lines("app.js"), vec![1]);
    assert_eq!(h.model.find_breakpoint("app.js", 1).unwrap().id, first.id);
    assert_eq!(h.backend.removed_breakpoints(), vec![second.id.clone()]);
    assert_eq!(h.backend.breakpoints().len(), 1);
    let events = h.drain();
    assert_eq!((count_removed(&events), count_added(&events)), (1, 0));

    // The dropped id is no longer tracked
    h.model
        .handle_backend_event(BackendEvent::BreakpointResolved(resolution(&second.id, "u1", 2)))
        .await
        .unwrap();
    assert_eq!(h.lines("app.js"), vec![1]);
}

#[tokio::test]
async fn test_resolution_of_unknown_breakpoint_is_ignored() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a\nb\nc").await;
    h.model.set_breakpoint("app.js", 0, "", true).await.unwrap();
    h.drain();

    h.model
        .handle_backend_event(BackendEvent::BreakpointResolved(resolution("99", "u1", 2)))
        .await
        .unwrap();

    assert_eq!(h.lines("app.js"), vec![0]);
    assert!(h.model.find_breakpoint("app.js", 2).is_none());
    assert!(h.backend.removed_breakpoints().is_empty());
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_insertion_above_shifts_breakpoint_down() {
    let mut h = Harness::editable();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a\nb\nc").await;
    h.model.set_breakpoint("app.js", 1, "", true).await.unwrap();
    h.drain();

    h.model.edit_script_source("app.js", "a\nX\nb\nc").await.unwrap();

    assert_eq!(h.lines("app.js"), vec![2]);
    assert_eq!(h.backend.edits(), vec![("u1".to_string(), "a\nX\nb\nc".to_string())]);
    let events = h.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, PresentationEvent::SourceFileChanged { .. })));

    let content = h.model.request_content("app.js").await.unwrap();
    assert_eq!(content.text, "a\nX\nb\nc");
}

#[tokio::test]
async fn test_deleted_line_drops_breakpoint() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a\nb\nc").await;
    h.model.set_breakpoint("app.js", 1, "", true).await.unwrap();
    h.model.set_breakpoint("app.js", 2, "keep", true).await.unwrap();

    h.model.reanchor_after_edit("app.js", "a\nb\nc", "a\nc").await.unwrap();

    let remaining = h.model.breakpoints_for_file("app.js");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].line, 1);
    assert_eq!(remaining[0].condition, "keep");
}

#[tokio::test]
async fn test_rejected_edit_leaves_breakpoints() {
    let h = Harness::editable();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a\nb").await;
    h.model.set_breakpoint("app.js", 1, "", true).await.unwrap();
    h.backend.reject_edits("SyntaxError");

    let result = h.model.edit_script_source("app.js", "a\n(").await;
    assert!(matches!(result, Err(Error::EditRejected { ref reason, .. }) if reason.contains("SyntaxError")));
    assert_eq!(h.lines("app.js"), vec![1]);
    assert_eq!(h.model.request_content("app.js").await.unwrap().text, "a\nb");
}

#[tokio::test]
async fn test_edit_permission() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a").await;
    assert!(!h.model.can_edit_script_source("app.js"));
    assert!(matches!(
        h.model.edit_script_source("app.js", "b").await,
        Err(Error::EditNotAllowed(_))
    ));

    let h = Harness::editable();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a").await;
    h.parse(RawUnit::new("u2").with_url("page.html").at(3, 8), "b").await;
    assert!(h.model.can_edit_script_source("app.js"));
    assert!(!h.model.can_edit_script_source("page.html"));
    assert!(!h.model.can_edit_script_source("missing.js"));
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_breakpoints_are_saved_and_restored() {
    let backend = Arc::new(ScriptedBackend::new());
    let settings = Arc::new(MemorySettings::new());
    let collaborators = Collaborators::new(backend.clone()).with_settings(settings.clone());
    let h = Harness::build(Config::default(), collaborators, backend);

    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();").await;
    h.model.set_breakpoint("app.js", 1, "n > 3", false).await.unwrap();

    let saved = settings.load_breakpoints().unwrap();
    assert_eq!(
        saved,
        vec![PersistedBreakpoint {
            url: "app.js".to_string(),
            line_number: 1,
            column_number: 0,
            condition: "n > 3".to_string(),
            enabled: false,
        }]
    );

    // A fresh session restores before the script is parsed
    let backend = Arc::new(ScriptedBackend::new());
    let collaborators = Collaborators::new(backend.clone()).with_settings(settings.clone());
    let h = Harness::build(Config::default(), collaborators, backend);
    h.model
        .handle_backend_event(BackendEvent::DebuggerWasEnabled)
        .await
        .unwrap();
    assert_eq!(h.backend.breakpoints().len(), 1);

    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();").await;
    let restored = h.model.find_breakpoint("app.js", 1).unwrap();
    assert_eq!(restored.condition, "n > 3");
    assert!(!restored.enabled);
}

#[tokio::test]
async fn test_breakpoints_persist_to_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.breakpoints.settings_file = Some(dir.path().join("settings.json"));

    let backend = Arc::new(ScriptedBackend::new());
    let collaborators = Collaborators::from_config(backend.clone(), &config);
    let h = Harness::build(config.clone(), collaborators, backend);
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    h.model.set_breakpoint("app.js", 2, "", true).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(raw.contains("\"url\": \"app.js\""));

    let backend = Arc::new(ScriptedBackend::new());
    let collaborators = Collaborators::from_config(backend.clone(), &config);
    let h = Harness::build(config, collaborators, backend);
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    h.model
        .handle_backend_event(BackendEvent::DebuggerWasEnabled)
        .await
        .unwrap();
    assert_eq!(h.lines("app.js"), vec![2]);
}

#[tokio::test]
async fn test_restored_breakpoint_waits_for_loading_document() {
    let backend = Arc::new(ScriptedBackend::new());
    let resources = Arc::new(StaticResources::new());
    resources.add_document(
        "page.html",
        "<html>\n<body>\n<script>x();</script>\n<p>done</p>\n</html>",
        false,
    );
    let settings = Arc::new(MemorySettings::with_breakpoints(vec![PersistedBreakpoint {
        url: "page.html".to_string(),
        line_number: 2,
        column_number: 0,
        condition: String::new(),
        enabled: true,
    }]));
    let mut config = Config::default();
    config.sources.reformat = true;
    let collaborators = Collaborators::new(backend.clone())
        .with_resources(resources.clone())
        .with_settings(settings);
    let h = Harness::build(config, collaborators, backend);

    h.model
        .handle_backend_event(BackendEvent::DebuggerWasEnabled)
        .await
        .unwrap();

    let limit = Duration::from_secs(1);
    timeout(limit, h.parse(RawUnit::new("u1").with_url("page.html").at(2, 8), "x();"))
        .await
        .expect("unit parse finishes while the document is loading");
    assert!(h.model.breakpoints_for_file("page.html").is_empty());

    // Other files stay usable in the meantime
    timeout(limit, h.parse(RawUnit::new("u2").with_url("app.js"), "a();")).await.unwrap();
    let bp = timeout(limit, h.model.set_breakpoint("app.js", 0, "", true))
        .await
        .expect("breakpoint on another file is not blocked")
        .unwrap();
    assert!(bp.is_some());

    resources.finish("page.html");
    h.model.resource_finished("page.html");
    settle().await;

    let restored = h.model.breakpoints_for_file("page.html");
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].url.as_deref(), Some("page.html"));
    assert_eq!(h.backend.breakpoints().len(), 2);
}

#[tokio::test]
async fn test_persistence_can_be_disabled() {
    let backend = Arc::new(ScriptedBackend::new());
    let settings = Arc::new(MemorySettings::new());
    let mut config = Config::default();
    config.breakpoints.persist = false;
    let collaborators = Collaborators::new(backend.clone()).with_settings(settings.clone());
    let h = Harness::build(config, collaborators, backend);

    h.parse(RawUnit::new("u1").with_url("app.js"), "a();").await;
    h.model.set_breakpoint("app.js", 0, "", true).await.unwrap();
    assert!(settings.load_breakpoints().unwrap().is_empty());
}

// ============================================================================
// Reformatting and console messages
// ============================================================================

#[tokio::test]
async fn test_toggle_reformat_reprojects_breakpoints() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "function f(){return 1;}").await;
    let bp = h.model.set_breakpoint("app.js", 0, "", true).await.unwrap().unwrap();

    // The backend places the breakpoint on the return statement
    let record = BackendBreakpoint {
        id: bp.id,
        url: Some("app.js".to_string()),
        unit_id: None,
        line: 0,
        column: 0,
        condition: String::new(),
        enabled: true,
        locations: vec![RawLocation {
            unit_id: "u1".to_string(),
            line: 0,
            column: 13,
        }],
    };
    h.model
        .handle_backend_event(BackendEvent::BreakpointResolved(record))
        .await
        .unwrap();
    assert_eq!(h.lines("app.js"), vec![0]);
    h.drain();

    assert!(h.model.toggle_reformat().await.unwrap());
    let file = h.model.source_file("app.js").unwrap();
    assert_eq!(file.kind(), SourceFileKind::Formatted);
    assert_eq!(
        h.model.request_content("app.js").await.unwrap().text,
        "function f(){\n    return 1;\n}\n"
    );
    settle().await;
    assert_eq!(h.lines("app.js"), vec![1]);

    let events = h.drain();
    assert!(matches!(events.first(), Some(PresentationEvent::Reset)));
    assert_eq!(count_added(&events), 1);

    assert!(!h.model.toggle_reformat().await.unwrap());
    assert_eq!(h.lines("app.js"), vec![0]);
}

#[tokio::test]
async fn test_console_messages_follow_their_file() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\n").await;
    h.drain();

    let message = ConsoleMessage {
        url: Some("app.js".to_string()),
        line: 2,
        level: MessageLevel::Error,
        text: "boom".to_string(),
    };
    let presented = h.model.add_console_message(message).unwrap();
    assert_eq!(presented.line, 1);
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, PresentationEvent::ConsoleMessageAdded(m) if m.line == 1)));

    let stray = ConsoleMessage {
        url: Some("other.js".to_string()),
        line: 1,
        level: MessageLevel::Log,
        text: "hi".to_string(),
    };
    assert!(h.model.add_console_message(stray).is_none());

    h.model.toggle_reformat().await.unwrap();
    settle().await;
    let messages = h.model.source_file("app.js").unwrap().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].line, 1);

    h.model.clear_console_messages();
    assert!(h.model.source_file("app.js").unwrap().messages().is_empty());
}

// ============================================================================
// Call stack
// ============================================================================

#[tokio::test]
async fn test_resume_resets_frame_selection() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    let frames = || vec![frame("f0", "u1", 0), frame("f1", "u1", 1), frame("f2", "u1", 2)];

    h.pause(frames()).await;
    assert_eq!(h.model.selected_call_frame().map(|f| f.index), Some(0));

    h.model.select_call_frame(2).await.unwrap();
    h.pause(frames()).await;
    assert_eq!(h.model.selected_call_frame().map(|f| f.index), Some(2));

    h.model
        .handle_backend_event(BackendEvent::DebuggerResumed)
        .await
        .unwrap();
    assert!(h.model.call_frames().is_empty());
    assert!(h.model.selected_call_frame().is_none());

    h.pause(frames()).await;
    assert_eq!(h.model.selected_call_frame().map(|f| f.index), Some(0));
    assert_eq!(
        h.backend.selected_frames(),
        vec!["f0", "f2", "f2", "f0"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_frame_locations_and_evaluation() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;

    let mut inner = frame("f0", "u1", 1);
    inner.column = 2;
    h.pause(vec![inner, frame("f1", "native", 7)]).await;

    let frames = h.model.call_frames();
    assert_eq!(frames[0].file_id.as_deref(), Some("app.js"));
    assert!(frames[1].is_internal_script());

    assert_eq!(
        h.model.call_frame_source_location(0).await.unwrap(),
        FrameLocation {
            file_id: Some("app.js".to_string()),
            line: 1,
            column: 2
        }
    );
    assert_eq!(
        h.model.call_frame_source_location(1).await.unwrap(),
        FrameLocation {
            file_id: None,
            line: 7,
            column: 0
        }
    );
    assert!(matches!(
        h.model.call_frame_source_location(5).await,
        Err(Error::FrameNotFound(5))
    ));

    let value = h.model.evaluate_in_frame(1, "x + 1").await.unwrap();
    assert_eq!(value["frameId"], "f1");
    assert_eq!(value["expression"], "x + 1");
}

#[tokio::test]
async fn test_continue_to_line_requires_pause() {
    let h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();\nb();\nc();").await;
    assert!(matches!(
        h.model.continue_to_line("app.js", 2).await,
        Err(Error::NotPaused)
    ));

    h.pause(vec![frame("f0", "u1", 0)]).await;
    h.model.continue_to_line("app.js", 2).await.unwrap();
    assert_eq!(
        h.backend.continued(),
        vec![RawLocation {
            unit_id: "u1".to_string(),
            line: 2,
            column: 0
        }]
    );
}

#[tokio::test]
async fn test_reset_drops_everything() {
    let mut h = Harness::new();
    h.parse(RawUnit::new("u1").with_url("app.js"), "a();").await;
    h.model.set_breakpoint("app.js", 0, "", true).await.unwrap();
    h.pause(vec![frame("f0", "u1", 0)]).await;
    h.drain();

    h.model.handle_backend_event(BackendEvent::Reset).await.unwrap();

    assert!(h.model.source_file("app.js").is_none());
    assert!(h.model.call_frames().is_empty());
    assert!(!h.model.is_paused());
    assert!(matches!(h.drain().last(), Some(PresentationEvent::Reset)));

    // URL breakpoints come back once the page parses the script again
    h.parse(RawUnit::new("u9").with_url("app.js"), "a();").await;
    assert_eq!(h.lines("app.js"), vec![0]);
}
