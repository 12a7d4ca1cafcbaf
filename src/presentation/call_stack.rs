//! Call stack projection

use serde::Serialize;

use crate::backend::{BackendCallFrame, PausedDetails};
use crate::common::{Error, Result};

/// A paused call frame with the source file it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedCallFrame {
    /// Position in the stack, 0 being the innermost frame
    pub index: usize,
    /// `None` for frames in scripts without a source file
    pub file_id: Option<String>,
    #[serde(flatten)]
    pub frame: BackendCallFrame,
}

impl PresentedCallFrame {
    pub fn is_internal_script(&self) -> bool {
        self.file_id.is_none()
    }

    pub fn function_name(&self) -> &str {
        &self.frame.function_name
    }
}

/// Presented location of a call frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameLocation {
    pub file_id: Option<String>,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Default)]
pub(crate) struct CallStack {
    frames: Vec<PresentedCallFrame>,
    details: Option<PausedDetails>,
    selected: usize,
}

impl CallStack {
    /// Replace the frames; returns the index to select
    ///
    /// The previous selection survives a re-pause when it is still in range.
    pub fn pause(&mut self, frames: Vec<PresentedCallFrame>, details: PausedDetails) -> usize {
        if self.selected >= frames.len() {
            self.selected = 0;
        }
        self.frames = frames;
        self.details = Some(details);
        self.selected
    }

    pub fn resume(&mut self) {
        self.frames.clear();
        self.details = None;
        self.selected = 0;
    }

    pub fn is_paused(&self) -> bool {
        self.details.is_some()
    }

    pub fn select(&mut self, index: usize) -> Result<PresentedCallFrame> {
        let frame = self.frame(index)?.clone();
        self.selected = index;
        Ok(frame)
    }

    pub fn frame(&self, index: usize) -> Result<&PresentedCallFrame> {
        if !self.is_paused() {
            return Err(Error::NotPaused);
        }
        self.frames.get(index).ok_or(Error::FrameNotFound(index))
    }

    pub fn selected(&self) -> Option<&PresentedCallFrame> {
        self.frames.get(self.selected)
    }

    pub fn frames(&self) -> &[PresentedCallFrame] {
        &self.frames
    }

    /// Backend frames and pause details, for projecting them again
    pub fn snapshot(&self) -> Option<(Vec<BackendCallFrame>, PausedDetails)> {
        let details = self.details.clone()?;
        let frames = self.frames.iter().map(|frame| frame.frame.clone()).collect();
        Some((frames, details))
    }
}
