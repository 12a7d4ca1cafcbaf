//! Logical source files built from raw script units

pub mod file;
pub mod formatter;
pub mod registry;

pub use file::{
    concatenate_units, Concatenation, ContentLoader, SourceContent, SourceFile, SourceFileKind,
    UnitRange,
};
pub use formatter::{BasicFormatter, FormattedContent, ScriptFormatter, HTML_MIME, JAVASCRIPT_MIME};
pub use registry::SourceRegistry;
