//! Domain models for the roster import pipeline.
//!
//! - [`ImportRow`] - one candidate email and where it stands
//! - [`RowStatus`] - the six row states
//! - [`ImportSummary`] - aggregate counts of a finished batch
//! - [`Stage`] - the four session stages
//! - [`LinkedClient`] / [`LinkOutcome`] - what the client directory hands back

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Row Status
// =============================================================================

/// Status of a single import row.
///
/// ```text
/// pending ─▶ valid ─▶ success
///    │         └────▶ error
///    ├────▶ invalid
///    └────▶ duplicate
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Created, not classified yet.
    Pending,
    /// Passed every check, will be sent to the directory.
    Valid,
    /// Not shaped like an email address.
    Invalid,
    /// Repeated in the file or already on the roster.
    Duplicate,
    /// Linked by the directory.
    Success,
    /// The directory call failed.
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Duplicate => "duplicate",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Linked Client
// =============================================================================

/// Minimal client profile returned by the directory after a successful link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkedClient {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Successful answer of the directory for one email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Profile of the linked client, when the directory returns one.
    pub client: Option<LinkedClient>,
    /// Confirmation text, used instead of the default row message.
    pub message: Option<String>,
}

impl LinkOutcome {
    pub fn linked(client: LinkedClient) -> Self {
        Self { client: Some(client), message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// =============================================================================
// Import Row
// =============================================================================

/// One candidate email of a batch.
///
/// The email is fixed at creation; only status, message and the linked
/// client move as the row advances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    email: String,
    /// 1-based physical line in the source file, header included.
    pub original_line_number: usize,
    pub status: RowStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<LinkedClient>,
}

impl ImportRow {
    /// New `pending` row. The email is normalized here.
    pub fn new(email: &str, original_line_number: usize) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            original_line_number,
            status: RowStatus::Pending,
            message: String::new(),
            client: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_status(&mut self, status: RowStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    pub fn is_valid(&self) -> bool {
        self.status == RowStatus::Valid
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Aggregate counts of a completed batch.
///
/// `total == successful + failed + duplicates + invalid`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

impl ImportSummary {
    /// Rows that were sent to the directory.
    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }
}

// =============================================================================
// Session Stage
// =============================================================================

/// Stage of an import session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Upload,
    Preview,
    Importing,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Preview => "preview",
            Self::Importing => "importing",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_normalizes_email() {
        let row = ImportRow::new("  Jane.Doe@Example.COM ", 3);
        assert_eq!(row.email(), "jane.doe@example.com");
        assert_eq!(row.original_line_number, 3);
        assert_eq!(row.status, RowStatus::Pending);
    }

    #[test]
    fn test_row_serializes_camel_case() {
        let mut row = ImportRow::new("a@b.com", 2);
        row.set_status(RowStatus::Valid, "Ready to import");
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["originalLineNumber"], 2);
        assert_eq!(json["status"], "valid");
        assert!(json.get("client").is_none());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::default(), Stage::Upload);
        assert_eq!(Stage::Importing.to_string(), "importing");
        assert_eq!(serde_json::to_value(Stage::Complete).unwrap(), "complete");
    }
}
