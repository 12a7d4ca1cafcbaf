//! Line-ending tables for converting between (line, column) and offsets

use std::ops::Range;

/// Offsets of every `\n` in a text, followed by the text length
///
/// Columns and offsets are byte based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEndings {
    endings: Vec<usize>,
}

impl LineEndings {
    pub fn new(text: &str) -> Self {
        let mut endings: Vec<usize> = text.match_indices('\n').map(|(i, _)| i).collect();
        endings.push(text.len());
        Self { endings }
    }

    /// Number of lines, counting a trailing empty line
    pub fn line_count(&self) -> usize {
        self.endings.len()
    }

    /// Offset of the first character of `line`
    ///
    /// Lines past the end clamp to the end of the text.
    pub fn line_start(&self, line: u32) -> usize {
        let line = line as usize;
        if line == 0 {
            0
        } else if line < self.endings.len() {
            self.endings[line - 1] + 1
        } else {
            self.endings[self.endings.len() - 1]
        }
    }

    /// Byte range of `line` without its terminating newline
    pub fn line_range(&self, line: u32) -> Option<Range<usize>> {
        let end = *self.endings.get(line as usize)?;
        Some(self.line_start(line)..end)
    }

    pub fn location_to_position(&self, line: u32, column: u32) -> usize {
        self.line_start(line) + column as usize
    }

    pub fn position_to_location(&self, position: usize) -> (u32, u32) {
        let line = self.endings.partition_point(|&ending| ending < position);
        let column = if line == 0 {
            position
        } else {
            position - self.endings[line - 1] - 1
        };
        (line as u32, column as u32)
    }
}
