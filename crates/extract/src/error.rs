//! Error types for extraction and parsing

use serde::Serialize;
use thiserror::Error;

/// Discriminant of [`ExtractError`], ordered from transport up to validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransportError,
    InvalidResponseStructure,
    MissingSeparator,
    MalformedDirective,
    EmptyTable,
    MalformedTable,
    UnknownColumn,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportError => "transport_error",
            ErrorKind::InvalidResponseStructure => "invalid_response_structure",
            ErrorKind::MissingSeparator => "missing_separator",
            ErrorKind::MalformedDirective => "malformed_directive",
            ErrorKind::EmptyTable => "empty_table",
            ErrorKind::MalformedTable => "malformed_table",
            ErrorKind::UnknownColumn => "unknown_column",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Network failure or non-success status, after the retry budget is spent
    #[error("AI service call failed after {attempts} attempt(s): {detail}")]
    Transport { attempts: u32, detail: String },

    #[error("Invalid AI response structure: {0}")]
    InvalidResponseStructure(String),

    /// `excerpt` is the start of the model's reply
    #[error("AI did not return a valid response (no '{separator}' separator): {excerpt}")]
    MissingSeparator { separator: String, excerpt: String },

    #[error("Malformed chart directive: {0}")]
    MalformedDirective(String),

    #[error("AI response contains no tabular data")]
    EmptyTable,

    /// Row 0 is the header; blank lines are not counted
    #[error("Malformed table at row {row} (header is row 0, blank lines not counted): {detail}")]
    MalformedTable { row: usize, detail: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Transport { .. } => ErrorKind::TransportError,
            ExtractError::InvalidResponseStructure(_) => ErrorKind::InvalidResponseStructure,
            ExtractError::MissingSeparator { .. } => ErrorKind::MissingSeparator,
            ExtractError::MalformedDirective(_) => ErrorKind::MalformedDirective,
            ExtractError::EmptyTable => ErrorKind::EmptyTable,
            ExtractError::MalformedTable { .. } => ErrorKind::MalformedTable,
            ExtractError::UnknownColumn(_) => ErrorKind::UnknownColumn,
        }
    }

    /// Whether the remote service (rather than its output) is at fault.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransportError | ErrorKind::InvalidResponseStructure
        )
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        ExtractError::InvalidResponseStructure(format!("JSON parse error: {}", e))
    }
}
