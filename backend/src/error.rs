//! Error types for the roster import pipeline.
//!
//! - [`ParseError`] - file decoding and email extraction errors
//! - [`LinkError`] - failures of the external client directory (row-level only)
//! - [`SessionError`] - rejected session transitions
//! - [`ConfigError`] - invalid environment configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layer boundaries.

use thiserror::Error;

use crate::models::Stage;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors raised while turning an uploaded file into candidates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The uploaded file has no content at all.
    #[error("File is empty")]
    EmptyFile,

    /// The file was read but no email candidate survived parsing.
    #[error("No emails found in file")]
    NoEmailsFound,

    /// Only `.csv` and `.txt` files are accepted.
    #[error("Unsupported file type: {0} (expected .csv or .txt)")]
    UnsupportedFileType(String),

    /// Bytes could not be decoded to text.
    #[error("Failed to decode file: {0}")]
    Encoding(String),
}

// =============================================================================
// Client Directory Errors
// =============================================================================

/// Errors from the external client-linking collaborator.
///
/// These never escape the executor: each one is recorded on the row it
/// happened to and the batch carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The directory refused the link (business rule).
    #[error("{0}")]
    Rejected(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The directory answered with something we cannot read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The call exceeded the configured link timeout.
    #[error("Request timed out")]
    Timeout,

    /// Failure without any message.
    #[error("Unknown error")]
    Unknown,
}

impl LinkError {
    /// Message stored on an `error` row.
    pub fn row_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            text
        }
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// A session operation that is not allowed in the current state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The uploaded file could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Operation requires a different stage.
    #[error("Operation requires stage '{expected}', session is at '{actual}'")]
    WrongStage { expected: Stage, actual: Stage },

    /// Start was requested but nothing is importable.
    #[error("No valid emails to import")]
    NoValidRows,

    /// Row removal with a bad index.
    #[error("Row {index} does not exist (session has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    /// An update arrived for a session that has since been reset.
    #[error("Import run no longer matches the current session")]
    StaleRun,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session transition rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Roster could not be fetched from the client directory.
    #[error("Client directory error: {0}")]
    Directory(#[from] LinkError),

    /// A previous run is still calling the directory.
    #[error("A previous import is still running")]
    RunInProgress,

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for collaborator calls.
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
