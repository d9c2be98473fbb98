//! Import session state machine.
//!
//! ```text
//!            load (≥1 email)        start (≥1 valid)       last row done
//!  ┌────────┐ ───────────▶ ┌─────────┐ ──────────▶ ┌───────────┐ ──────────▶ ┌──────────┐
//!  │ upload │              │ preview │             │ importing │             │ complete │
//!  └────────┘ ◀─────────── └─────────┘             └───────────┘             └──────────┘
//!       ▲        reset        │   ▲ remove row                                      │
//!       └─────────────────────┴───┴──────────────────── reset ──────────────────────┘
//! ```
//!
//! Only the executor mutates rows while importing; everything else reads
//! snapshots. `complete` is terminal until [`ImportSession::reset`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::executor::{Executor, ProgressSink, RowUpdate};
use super::summary::summarize;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{SessionError, SessionResult};
use crate::models::{ImportRow, ImportSummary, RowStatus, Stage};
use crate::parser::{check_file_type, parse_bytes_auto, parse_emails, Candidate};
use crate::validation::{classify_candidates, count_valid, Roster};

/// Rows handed to the executor when an import starts.
#[derive(Debug, Clone)]
pub struct ImportRun {
    /// Session the results belong to
    pub session_id: Uuid,
    /// Copy of the session rows at start time
    pub rows: Vec<ImportRow>,
    /// Rows that will be attempted
    pub total: usize,
}

/// One uploaded batch and its progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSession {
    id: Uuid,
    stage: Stage,
    file_name: Option<String>,
    rows: Vec<ImportRow>,
    progress_percent: u8,
    summary: Option<ImportSummary>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    /// Empty session at `upload`.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Upload,
            file_name: None,
            rows: Vec::new(),
            progress_percent: 0,
            summary: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn rows(&self) -> &[ImportRow] {
        &self.rows
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Only set once the session is `complete`.
    pub fn summary(&self) -> Option<&ImportSummary> {
        self.summary.as_ref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn valid_count(&self) -> usize {
        count_valid(&self.rows)
    }

    fn expect_stage(&self, expected: Stage) -> SessionResult<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(SessionError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    // =========================================================================
    // upload → preview
    // =========================================================================

    /// Load pasted or already-decoded text.
    pub fn load_text(&mut self, content: &str, roster: &Roster) -> SessionResult<&[ImportRow]> {
        self.expect_stage(Stage::Upload)?;
        let candidates = parse_emails(content)?;
        self.enter_preview(None, &candidates, roster);
        Ok(&self.rows)
    }

    /// Load an uploaded file. The name must end in `.csv` or `.txt`.
    ///
    /// On any parse failure the session stays at `upload`.
    pub fn load_file(&mut self, file_name: &str, bytes: &[u8], roster: &Roster) -> SessionResult<&[ImportRow]> {
        self.expect_stage(Stage::Upload)?;
        check_file_type(file_name)?;
        let parsed = parse_bytes_auto(bytes)?;

        log_info(format!("📖 Read {} ({}, {} lines)", file_name, parsed.encoding, parsed.line_count));
        if parsed.has_header {
            log_info("Header line skipped");
        }

        self.enter_preview(Some(file_name.to_string()), &parsed.candidates, roster);
        Ok(&self.rows)
    }

    fn enter_preview(&mut self, file_name: Option<String>, candidates: &[Candidate], roster: &Roster) {
        self.rows = classify_candidates(candidates, roster);
        self.file_name = file_name;
        self.stage = Stage::Preview;

        let count = |status: RowStatus| self.rows.iter().filter(|r| r.status == status).count();
        log_success(format!("Found {} email(s)", self.rows.len()));
        log_info(format!(
            "{} ready, {} invalid, {} duplicate",
            count(RowStatus::Valid),
            count(RowStatus::Invalid),
            count(RowStatus::Duplicate)
        ));
    }

    // =========================================================================
    // preview
    // =========================================================================

    /// Drop a row before the import starts. The others keep their status.
    pub fn remove_row(&mut self, index: usize) -> SessionResult<ImportRow> {
        self.expect_stage(Stage::Preview)?;
        if index >= self.rows.len() {
            return Err(SessionError::RowOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    // =========================================================================
    // preview → importing → complete
    // =========================================================================

    /// Enter `importing` and hand out the rows to execute.
    ///
    /// Rejected without any state change when no row is `valid`.
    pub fn begin_import(&mut self) -> SessionResult<ImportRun> {
        self.expect_stage(Stage::Preview)?;
        let total = self.valid_count();
        if total == 0 {
            log_warning("No valid emails to import");
            return Err(SessionError::NoValidRows);
        }

        self.stage = Stage::Importing;
        self.progress_percent = 0;
        self.started_at = Some(Utc::now());

        Ok(ImportRun {
            session_id: self.id,
            rows: self.rows.clone(),
            total,
        })
    }

    /// Record one executed row. The last one moves the session to `complete`.
    pub fn apply_update(&mut self, session_id: Uuid, update: &RowUpdate) -> SessionResult<()> {
        if session_id != self.id {
            return Err(SessionError::StaleRun);
        }
        self.expect_stage(Stage::Importing)?;

        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(update.index)
            .ok_or(SessionError::RowOutOfRange { index: update.index, len })?;
        *row = update.row.clone();
        self.progress_percent = self.progress_percent.max(update.progress_percent);

        if update.completed >= update.total {
            self.finish();
        }
        Ok(())
    }

    fn finish(&mut self) {
        let summary = summarize(&self.rows);
        self.summary = Some(summary);
        self.progress_percent = 100;
        self.stage = Stage::Complete;
        self.completed_at = Some(Utc::now());

        log_success(format!(
            "✨ Import complete: {} added, {} failed, {} duplicate, {} invalid",
            summary.successful, summary.failed, summary.duplicates, summary.invalid
        ));
    }

    /// Run the whole import in place and return the summary.
    pub async fn run_import<S: ProgressSink + ?Sized>(
        &mut self,
        executor: &Executor,
        sink: &mut S,
    ) -> SessionResult<ImportSummary> {
        let ImportRun { session_id, mut rows, .. } = self.begin_import()?;

        let mut failure = None;
        executor
            .run(&mut rows, &mut |update: &RowUpdate| {
                if let Err(e) = self.apply_update(session_id, update) {
                    failure.get_or_insert(e);
                }
                sink.row_finished(update);
            })
            .await;

        if let Some(e) = failure {
            return Err(e);
        }
        self.summary.ok_or(SessionError::WrongStage {
            expected: Stage::Complete,
            actual: self.stage,
        })
    }

    // =========================================================================
    // any → upload
    // =========================================================================

    /// Discard everything and start over with a fresh session id.
    pub fn reset(&mut self) {
        if self.stage == Stage::Importing {
            log_warning("Session reset while importing, remaining results will be discarded");
        }
        *self = Self::new();
    }
}
