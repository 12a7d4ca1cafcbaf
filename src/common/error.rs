//! Error types for the script inspector
//!
//! Most failures inside the presentation model resolve to a fallback state
//! (empty content, dropped breakpoint, rolled-back edit). The variants here
//! are what reaches a caller that asked for something directly.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the script inspector
#[derive(Error, Debug)]
pub enum Error {
    // === Backend Errors ===
    #[error("Backend request '{request}' failed: {message}")]
    BackendRequestFailed { request: String, message: String },

    #[error("Backend is not available: {0}")]
    BackendUnavailable(String),

    // === Source File Errors ===
    #[error("Source file '{0}' not found")]
    SourceFileNotFound(String),

    #[error("Script unit '{0}' not found")]
    UnitNotFound(String),

    #[error("Content of '{file_id}' could not be loaded: {reason}")]
    ContentUnavailable { file_id: String, reason: String },

    #[error("Source file '{0}' was discarded before its content arrived")]
    ContentDropped(String),

    #[error("No coordinate mapping available for '{0}'")]
    MappingUnavailable(String),

    #[error("Line {line} of '{file_id}' does not map to any script")]
    UnresolvedLocation { file_id: String, line: u32 },

    // === Breakpoint Errors ===
    #[error("No breakpoint at line {line} of '{file_id}'")]
    BreakpointNotFound { file_id: String, line: u32 },

    // === Live Edit Errors ===
    #[error("Live edit is not allowed for '{0}'")]
    EditNotAllowed(String),

    #[error("Backend rejected the edit of '{file_id}': {reason}")]
    EditRejected { file_id: String, reason: String },

    // === Call Frame Errors ===
    #[error("Debugger is not paused")]
    NotPaused,

    #[error("Call frame {0} not found")]
    FrameNotFound(usize),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid unit '{0}'. Expected FILE, FILE@LINE or FILE@LINE:COLUMN")]
    InvalidUnitSpec(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a backend request failed error
    pub fn backend_request_failed(request: &str, message: impl ToString) -> Self {
        Self::BackendRequestFailed {
            request: request.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a content unavailable error
    pub fn content_unavailable(file_id: &str, reason: impl ToString) -> Self {
        Self::ContentUnavailable {
            file_id: file_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a breakpoint not found error
    pub fn breakpoint_not_found(file_id: &str, line: u32) -> Self {
        Self::BreakpointNotFound {
            file_id: file_id.to_string(),
            line,
        }
    }

    /// Short machine-readable code, used in structured log fields and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Error::BackendRequestFailed { .. } | Error::BackendUnavailable(_) => "BACKEND",
            Error::SourceFileNotFound(_) => "SOURCE_FILE_NOT_FOUND",
            Error::UnitNotFound(_) => "UNIT_NOT_FOUND",
            Error::ContentUnavailable { .. } | Error::ContentDropped(_) => "FETCH_FAILURE",
            Error::MappingUnavailable(_) | Error::UnresolvedLocation { .. } => {
                "UNRESOLVED_MAPPING"
            }
            Error::BreakpointNotFound { .. } => "BREAKPOINT_NOT_FOUND",
            Error::EditNotAllowed(_) | Error::EditRejected { .. } => "EDIT_REJECTED",
            Error::NotPaused | Error::FrameNotFound(_) => "INVALID_STATE",
            Error::Config(_) | Error::ConfigParse(_) | Error::InvalidUnitSpec(_) => "CONFIG",
            Error::Io(_) | Error::FileRead { .. } => "IO",
            Error::Json(_) => "JSON",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serializable error for the CLI's JSON output
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(e: &Error) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}
