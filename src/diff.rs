//! Line-based diff used for live-edit breakpoint re-anchoring
//!
//! Lines that occur exactly once in both texts are matched first; matches
//! are then extended forwards and backwards over equal neighbouring lines.
//! The result maps every old line to its new line and back, with `None`
//! for lines the diff could not pair.

use std::collections::HashMap;

/// Line correspondence between an old and a new text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// For each old line, the matching new line
    pub forward: Vec<Option<usize>>,
    /// For each new line, the matching old line
    pub reverse: Vec<Option<usize>>,
}

#[derive(Default)]
struct Occurrences {
    old_count: usize,
    old_row: usize,
    new_count: usize,
    new_row: usize,
}

/// Diff two texts line by line (lines split on `\n`)
pub fn diff_text(old: &str, new: &str) -> LineDiff {
    let old: Vec<&str> = old.split('\n').collect();
    let new: Vec<&str> = new.split('\n').collect();
    line_diff(&old, &new)
}

pub fn line_diff<S: AsRef<str>>(old: &[S], new: &[S]) -> LineDiff {
    let mut forward = vec![None; old.len()];
    let mut reverse = vec![None; new.len()];

    let mut table: HashMap<&str, Occurrences> = HashMap::new();
    for (row, line) in new.iter().enumerate() {
        let entry = table.entry(line.as_ref()).or_default();
        entry.new_count += 1;
        entry.new_row = row;
    }
    for (row, line) in old.iter().enumerate() {
        let entry = table.entry(line.as_ref()).or_default();
        entry.old_count += 1;
        entry.old_row = row;
    }

    for entry in table.values() {
        if entry.old_count == 1 && entry.new_count == 1 {
            forward[entry.old_row] = Some(entry.new_row);
            reverse[entry.new_row] = Some(entry.old_row);
        }
    }

    // Grow matched regions downwards over equal unmatched lines.
    for i in 0..new.len().saturating_sub(1) {
        let Some(row) = reverse[i] else { continue };
        let next = row + 1;
        if reverse[i + 1].is_none()
            && next < old.len()
            && forward[next].is_none()
            && new[i + 1].as_ref() == old[next].as_ref()
        {
            reverse[i + 1] = Some(next);
            forward[next] = Some(i + 1);
        }
    }

    // And upwards.
    for i in (1..new.len()).rev() {
        let Some(row) = reverse[i] else { continue };
        if row == 0 {
            continue;
        }
        let prev = row - 1;
        if reverse[i - 1].is_none()
            && forward[prev].is_none()
            && new[i - 1].as_ref() == old[prev].as_ref()
        {
            reverse[i - 1] = Some(prev);
            forward[prev] = Some(i - 1);
        }
    }

    LineDiff { forward, reverse }
}

impl LineDiff {
    /// New position of an old line after the edit
    ///
    /// A line that survived maps directly. A line with no counterpart is
    /// re-anchored relative to the nearest mapped line above it, but only
    /// when the candidate line in the new text is itself unmatched or maps
    /// back to the same old line.
    pub fn reanchor(&self, line: usize) -> Option<usize> {
        if let Some(mapped) = self.forward.get(line).copied().flatten() {
            return Some(mapped);
        }
        if line >= self.forward.len() {
            return None;
        }

        let (anchor, anchor_new) = (0..line)
            .rev()
            .find_map(|i| self.forward[i].map(|new_row| (i, new_row)))?;
        let candidate = anchor_new + (line - anchor);
        match self.reverse.get(candidate) {
            Some(None) => Some(candidate),
            Some(Some(original)) if *original == line => Some(candidate),
            _ => None,
        }
    }
}
