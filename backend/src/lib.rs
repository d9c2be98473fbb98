//! # Rosterload - bulk import of client emails into a practice roster
//!
//! Rosterload takes a CSV or plain-text list of client emails, checks every
//! row, shows a preview and then links the valid emails one by one through
//! the practice's client directory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / TXT  │────▶│   Parser    │────▶│  Validator  │────▶│  Executor   │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (dup/roster)│     │ (throttled) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                                                             ┌─────────────┐
//!                                                             │   Summary   │
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rosterload::{HttpClientDirectory, Executor, ImportSession, NoProgress, Roster};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let directory = Arc::new(HttpClientDirectory::new("https://api.example.com"));
//!     let mut session = ImportSession::new();
//!     session.load_text("email\nana@example.com", &Roster::default()).unwrap();
//!
//!     let summary = session
//!         .run_import(&Executor::new(directory), &mut NoProgress)
//!         .await
//!         .unwrap();
//!     println!("Added {} clients", summary.successful);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Rows, statuses, summary and stages
//! - [`parser`] - File decoding and email extraction
//! - [`validation`] - Format, duplicate and roster checks
//! - [`directory`] - Client directory traits and HTTP client
//! - [`import`] - Executor, session state machine, report and template
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Client directory
pub mod directory;

// Import workflow
pub mod import;

pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, LinkError, ParseError, ServerError, SessionError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ImportRow, ImportSummary, LinkOutcome, LinkedClient, RowStatus, Stage};

// =============================================================================
// Re-exports - Parsing & validation
// =============================================================================

pub use parser::{
    check_file_type, decode_content, detect_encoding, parse_bytes_auto, parse_emails,
    parse_file_auto, Candidate, ParsedFile,
};
pub use validation::{classify_candidates, count_valid, is_valid_email, Roster};

// =============================================================================
// Re-exports - Directory
// =============================================================================

pub use directory::{ClientLinker, HttpClientDirectory, RosterSource};

// =============================================================================
// Re-exports - Import
// =============================================================================

pub use import::{
    report_csv, summarize, template_csv, Executor, ExecutorOptions, ImportSession, NoProgress,
    ProgressSink, RowUpdate,
};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
