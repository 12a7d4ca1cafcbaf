//! Source file registry
//!
//! Keeps every discovered unit and the source files built from them. Files
//! are keyed by [`RawUnit::file_id`]. Rebuilding on a reformat toggle and
//! resetting both bump [`SourceRegistry::epoch`] so that async work started
//! against the old files can tell it is stale.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::RawUnit;
use crate::events::PresentationEvent;

use super::file::{ContentLoader, SourceFile, SourceFileKind};

pub struct SourceRegistry {
    loader: ContentLoader,
    events: mpsc::UnboundedSender<PresentationEvent>,
    reformat: bool,
    epoch: u64,
    files: HashMap<String, Arc<SourceFile>>,
    /// Every known unit in discovery order
    units: Vec<RawUnit>,
}

impl SourceRegistry {
    pub fn new(
        loader: ContentLoader,
        events: mpsc::UnboundedSender<PresentationEvent>,
        reformat: bool,
    ) -> Self {
        Self {
            loader,
            events,
            reformat,
            epoch: 0,
            files: HashMap::new(),
            units: Vec::new(),
        }
    }

    pub fn reformat(&self) -> bool {
        self.reformat
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Fold a unit into its source file, creating the file on first sight
    pub fn on_unit_discovered(&mut self, unit: RawUnit) -> Arc<SourceFile> {
        if let Some(known) = self.units.iter_mut().find(|known| known.unit_id == unit.unit_id) {
            *known = unit.clone();
        } else {
            self.units.push(unit.clone());
        }
        self.place(unit)
    }

    fn place(&mut self, unit: RawUnit) -> Arc<SourceFile> {
        if let Some(file) = self.files.get(unit.file_id()) {
            file.add_script(unit);
            return Arc::clone(file);
        }

        let kind = if self.reformat {
            SourceFileKind::Formatted
        } else {
            SourceFileKind::Plain
        };
        let file_id = unit.file_id().to_string();
        tracing::debug!(file = %file_id, unit = %unit.unit_id, ?kind, "Source file added");

        let file = SourceFile::new(unit, kind, self.loader.clone(), self.events.clone());
        self.files.insert(file_id.clone(), Arc::clone(&file));
        let _ = self.events.send(PresentationEvent::SourceFileAdded { file_id });
        file
    }

    /// Switch reformat mode and rebuild every source file
    pub fn set_reformat(&mut self, reformat: bool) {
        self.reformat = reformat;
        self.epoch += 1;
        self.files.clear();
        let units = self.units.clone();
        for unit in units {
            self.place(unit);
        }
        tracing::info!(reformat, files = self.files.len(), "Source files rebuilt");
    }

    pub fn toggle_reformat(&mut self) -> bool {
        self.set_reformat(!self.reformat);
        self.reformat
    }

    /// Forget every unit and source file
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.files.clear();
        self.units.clear();
    }

    pub fn source_file(&self, file_id: &str) -> Option<Arc<SourceFile>> {
        self.files.get(file_id).cloned()
    }

    pub fn unit(&self, unit_id: &str) -> Option<&RawUnit> {
        self.units.iter().find(|unit| unit.unit_id == unit_id)
    }

    pub fn file_for_unit(&self, unit_id: &str) -> Option<Arc<SourceFile>> {
        let unit = self.unit(unit_id)?;
        self.source_file(unit.file_id())
    }

    pub fn files(&self) -> Vec<Arc<SourceFile>> {
        self.files.values().cloned().collect()
    }

    pub fn units(&self) -> &[RawUnit] {
        &self.units
    }
}
