//! Console messages anchored to presented lines

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Tip,
    #[default]
    Log,
    Warning,
    Error,
    Debug,
}

/// A console message as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 1-based line in the script that produced the message
    pub line: u32,
    #[serde(default)]
    pub level: MessageLevel,
    pub text: String,
}

/// A console message placed on a presented line of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedMessage {
    pub file_id: String,
    /// 0-based presented line
    pub line: u32,
    pub original: ConsoleMessage,
}
