//! Notifications published by the presentation model

use serde::Serialize;

use crate::backend::PausedDetails;
use crate::presentation::{PresentedBreakpoint, PresentedCallFrame, PresentedMessage};

/// Event delivered to presentation consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresentationEvent {
    /// A unit created a new source file
    SourceFileAdded { file_id: String },
    /// Materialized content of a source file was invalidated
    SourceFileChanged { file_id: String },
    BreakpointAdded(PresentedBreakpoint),
    BreakpointRemoved(PresentedBreakpoint),
    ConsoleMessageAdded(PresentedMessage),
    ConsoleMessagesCleared,
    DebuggerPaused {
        frames: Vec<PresentedCallFrame>,
        details: PausedDetails,
    },
    DebuggerResumed,
    CallFrameSelected(PresentedCallFrame),
    /// Every source file was dropped and rebuilt
    Reset,
}
