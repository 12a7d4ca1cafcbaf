//! Coordinate mapping between raw script units and presented source text
//!
//! A presented source file is either the verbatim text of its units (padded
//! so that every unit sits at its embedding offset) or a reformatted
//! transform of that text. [`SourceMapping`] converts locations in both
//! directions and resolves which unit owns a presented location.

pub mod text;

use serde::{Deserialize, Serialize};

use crate::backend::{RawUnit, UnitId};

pub use text::LineEndings;

/// A location in presented source coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// A location inside a specific raw unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLocation {
    pub unit_id: UnitId,
    pub line: u32,
    pub column: u32,
}

/// Parallel monotonic offset arrays produced by a formatter
///
/// `original[i]` in the unformatted text corresponds to `formatted[i]` in
/// the formatted text. Both start at 0 and end at the respective text length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMapping {
    pub original: Vec<usize>,
    pub formatted: Vec<usize>,
}

impl PositionMapping {
    /// Mapping between two texts that are identical
    pub fn identity(len: usize) -> Self {
        Self {
            original: vec![0, len],
            formatted: vec![0, len],
        }
    }
}

/// Which mapping strategy a source file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Direct,
    Formatted,
}

/// Bidirectional mapping for one source file
#[derive(Debug, Clone)]
pub enum SourceMapping {
    Direct(DirectMapping),
    Formatted(FormattedMapping),
}

impl SourceMapping {
    pub fn kind(&self) -> MappingKind {
        match self {
            Self::Direct(_) => MappingKind::Direct,
            Self::Formatted(_) => MappingKind::Formatted,
        }
    }

    pub fn script_location_to_source_location(&self, line: u32, column: u32) -> SourceLocation {
        match self {
            Self::Direct(mapping) => mapping.script_location_to_source_location(line, column),
            Self::Formatted(mapping) => mapping.script_location_to_source_location(line, column),
        }
    }

    /// Resolve a presented location to the unit that owns it
    ///
    /// `None` only when the mapping was built without any unit.
    pub fn source_location_to_script_location(
        &self,
        line: u32,
        column: u32,
    ) -> Option<ScriptLocation> {
        match self {
            Self::Direct(mapping) => mapping.source_location_to_script_location(line, column),
            Self::Formatted(mapping) => mapping.source_location_to_script_location(line, column),
        }
    }

    /// Same mapping over a different unit set
    pub fn with_units(&self, units: &[RawUnit]) -> Self {
        match self {
            Self::Direct(_) => Self::Direct(DirectMapping::new(units)),
            Self::Formatted(mapping) => Self::Formatted(FormattedMapping {
                direct: DirectMapping::new(units),
                ..mapping.clone()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UnitAnchor {
    unit_id: UnitId,
    line_offset: u32,
    column_offset: u32,
}

/// Identity mapping with nearest-preceding-unit resolution
#[derive(Debug, Clone)]
pub struct DirectMapping {
    units: Vec<UnitAnchor>,
}

impl DirectMapping {
    pub fn new(units: &[RawUnit]) -> Self {
        let mut units: Vec<UnitAnchor> = units
            .iter()
            .map(|unit| UnitAnchor {
                unit_id: unit.unit_id.clone(),
                line_offset: unit.line_offset,
                column_offset: unit.column_offset,
            })
            .collect();
        units.sort_by_key(|unit| (unit.line_offset, unit.column_offset));
        Self { units }
    }

    pub fn script_location_to_source_location(&self, line: u32, column: u32) -> SourceLocation {
        SourceLocation { line, column }
    }

    pub fn source_location_to_script_location(
        &self,
        line: u32,
        column: u32,
    ) -> Option<ScriptLocation> {
        let unit = self.unit_at(line, column)?;
        Some(ScriptLocation {
            unit_id: unit.unit_id.clone(),
            line,
            column,
        })
    }

    /// Last unit whose embedding offset is at or before the target; the
    /// first unit when the target precedes all of them.
    fn unit_at(&self, line: u32, column: u32) -> Option<&UnitAnchor> {
        let (first, rest) = self.units.split_first()?;
        let mut closest = first;
        for unit in rest {
            if (unit.line_offset, unit.column_offset) > (line, column) {
                break;
            }
            closest = unit;
        }
        Some(closest)
    }
}

/// Mapping for reformatted text, interpolating between formatter anchors
#[derive(Debug, Clone)]
pub struct FormattedMapping {
    direct: DirectMapping,
    original_endings: LineEndings,
    formatted_endings: LineEndings,
    positions: PositionMapping,
}

impl FormattedMapping {
    pub fn new(
        units: &[RawUnit],
        original_text: &str,
        formatted_text: &str,
        positions: PositionMapping,
    ) -> Self {
        Self {
            direct: DirectMapping::new(units),
            original_endings: LineEndings::new(original_text),
            formatted_endings: LineEndings::new(formatted_text),
            positions,
        }
    }

    pub fn script_location_to_source_location(&self, line: u32, column: u32) -> SourceLocation {
        let original = self.original_endings.location_to_position(line, column);
        let formatted = convert_position(
            &self.positions.original,
            &self.positions.formatted,
            original,
        );
        let (line, column) = self.formatted_endings.position_to_location(formatted);
        SourceLocation { line, column }
    }

    pub fn source_location_to_script_location(
        &self,
        line: u32,
        column: u32,
    ) -> Option<ScriptLocation> {
        let formatted = self.formatted_endings.location_to_position(line, column);
        let original = convert_position(
            &self.positions.formatted,
            &self.positions.original,
            formatted,
        );
        let (line, column) = self.original_endings.position_to_location(original);
        self.direct.source_location_to_script_location(line, column)
    }
}

/// Map `position` from the `from` offset space into the `to` space
///
/// The enclosing segment is found by upper-bound search; the offset inside it
/// is scaled by the ratio of segment lengths and rounded to the nearest
/// integer. A zero-length source segment maps to the target segment start.
fn convert_position(from: &[usize], to: &[usize], position: usize) -> usize {
    let len = from.len().min(to.len());
    if len == 0 {
        return position;
    }
    let index = from[..len].partition_point(|&p| p <= position);
    if index == 0 {
        return to[0];
    }
    if index == len {
        return to[len - 1];
    }

    let from_start = from[index - 1];
    let to_start = to[index - 1];
    let from_range = from[index] - from_start;
    let to_range = to[index].saturating_sub(to_start);
    if from_range == 0 {
        return to_start;
    }
    let delta = position - from_start;
    to_start + (delta * to_range + from_range / 2) / from_range
}
