//! script-inspector - the presentation layer of a script debugger
//!
//! Maps raw script-unit coordinates onto the source files a user sees
//! (inline scripts concatenated into their document, optionally
//! pretty-printed) and keeps breakpoints, call frames and console messages
//! anchored to presented lines.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod common;
pub mod diff;
pub mod events;
pub mod mapping;
pub mod presentation;
pub mod settings;
pub mod sources;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use events::PresentationEvent;
pub use presentation::{Collaborators, DebuggerPresentationModel};
