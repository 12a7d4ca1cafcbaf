//! CLI command definitions
//!
//! Offline tools over files on disk: they run the same mapping, formatting
//! and diff code the presentation model uses. Lines and columns are
//! zero-based everywhere.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Lay inline script units out as one document
    Concat {
        /// Units as FILE@LINE:COL, the file holding the unit's source and
        /// LINE:COL its position inside the document
        #[arg(required = true)]
        units: Vec<String>,

        /// Print JSON including each unit's range
        #[arg(long)]
        json: bool,
    },

    /// Pretty-print a script and show the formatter anchors
    Format {
        /// Script to format
        file: PathBuf,

        /// Spaces per nesting level (defaults to the configured indent)
        #[arg(long)]
        indent: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Project a location of a script into its pretty-printed form
    Map {
        file: PathBuf,

        line: u32,

        #[arg(default_value_t = 0)]
        column: u32,

        /// Treat the location as pretty-printed and map it back to the script
        #[arg(long)]
        to_script: bool,

        #[arg(long)]
        indent: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show where breakpoint lines end up after an edit
    Reanchor {
        /// Text before the edit
        old: PathBuf,

        /// Text after the edit
        new: PathBuf,

        /// Breakpoint lines in the old text
        #[arg(required = true)]
        lines: Vec<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Line correspondence between two versions of a file
    Diff {
        old: PathBuf,

        new: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Whether output (errors included) should be JSON
    pub fn json(&self) -> bool {
        match self {
            Self::Concat { json, .. }
            | Self::Format { json, .. }
            | Self::Map { json, .. }
            | Self::Reanchor { json, .. }
            | Self::Diff { json, .. } => *json,
        }
    }
}
