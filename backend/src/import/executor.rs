//! Sequential import executor.
//!
//! Sends every `valid` row to the client directory, one at a time, in file
//! order. Each result is written on its row and reported to a
//! [`ProgressSink`] before the inter-row delay, so callers see progress
//! between rows rather than at the end.
//!
//! ```text
//! valid rows: [r1, r3, r4]
//!   link(r1) ─▶ record ─▶ report 33% ─▶ sleep
//!   link(r3) ─▶ record ─▶ report 67% ─▶ sleep
//!   link(r4) ─▶ record ─▶ report 100%
//! ```
//!
//! A failing row never stops the batch.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::api::logs::{log_error, log_info, log_success_indent, log_warning};
use crate::directory::ClientLinker;
use crate::error::{LinkError, LinkResult};
use crate::models::{ImportRow, LinkOutcome, RowStatus};

/// Pause between two directory calls
pub const DEFAULT_ROW_DELAY: Duration = Duration::from_millis(300);

/// Upper bound for a single directory call
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(30);

pub const MSG_LINKED: &str = "Successfully added";

/// Executor tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Delay after each row, before the next call
    pub row_delay: Duration,
    /// Per-call timeout, `None` waits forever
    pub link_timeout: Option<Duration>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            row_delay: DEFAULT_ROW_DELAY,
            link_timeout: Some(DEFAULT_LINK_TIMEOUT),
        }
    }
}

/// Progress after one attempted row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowUpdate {
    /// Position of the row in the session
    pub index: usize,
    /// The row after its result was recorded
    pub row: ImportRow,
    /// Rows attempted so far, this one included
    pub completed: usize,
    /// Rows that were `valid` when the run started
    pub total: usize,
    pub progress_percent: u8,
}

/// Receives a [`RowUpdate`] after every attempted row.
pub trait ProgressSink {
    fn row_finished(&mut self, update: &RowUpdate);
}

impl<F> ProgressSink for F
where
    F: FnMut(&RowUpdate),
{
    fn row_finished(&mut self, update: &RowUpdate) {
        self(update)
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn row_finished(&mut self, _update: &RowUpdate) {}
}

/// `round(100 * completed / total)`, 100 for an empty run.
///
/// Capped at 99 until the last row, so 100 only ever means done.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 || completed >= total {
        return 100;
    }
    let rounded = (200 * completed + total) / (2 * total);
    rounded.min(99) as u8
}

/// Runs the directory calls for a batch
#[derive(Clone)]
pub struct Executor {
    linker: Arc<dyn ClientLinker>,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(linker: Arc<dyn ClientLinker>) -> Self {
        Self {
            linker,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Attempt every row that is `valid` now, in order.
    ///
    /// Returns the number of rows attempted.
    pub async fn run<S: ProgressSink + ?Sized>(&self, rows: &mut [ImportRow], sink: &mut S) -> usize {
        let pending: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_valid())
            .map(|(idx, _)| idx)
            .collect();
        let total = pending.len();

        log_info(format!("📤 Importing {} client(s)...", total));

        for (done, &index) in pending.iter().enumerate() {
            let row = &mut rows[index];
            let result = self.attempt(row.email()).await;
            record_result(row, result);

            match row.status {
                RowStatus::Success => log_success_indent(format!("{}: {}", row.email(), row.message), 1),
                _ => log_error(format!("{}: {}", row.email(), row.message)),
            }

            let completed = done + 1;
            sink.row_finished(&RowUpdate {
                index,
                row: row.clone(),
                completed,
                total,
                progress_percent: progress_percent(completed, total),
            });

            if completed < total && !self.options.row_delay.is_zero() {
                tokio::time::sleep(self.options.row_delay).await;
            }
        }

        total
    }

    /// One directory call, with timeout and panic capture.
    async fn attempt(&self, email: &str) -> LinkResult<LinkOutcome> {
        let call = AssertUnwindSafe(self.linker.link(email)).catch_unwind();

        let result = match self.options.link_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    log_warning(format!("{}: no answer after {:?}", email, limit));
                    return Err(LinkError::Timeout);
                }
            },
            None => call.await,
        };

        result.unwrap_or_else(|panic| Err(panic_to_error(panic)))
    }
}

fn panic_to_error(panic: Box<dyn std::any::Any + Send>) -> LinkError {
    let text = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned());

    match text {
        Some(text) if !text.trim().is_empty() => LinkError::Rejected(text),
        _ => LinkError::Unknown,
    }
}

/// Write a directory result onto its row.
pub fn record_result(row: &mut ImportRow, result: LinkResult<LinkOutcome>) {
    match result {
        Ok(outcome) => {
            let message = outcome.message.unwrap_or_else(|| MSG_LINKED.to_string());
            row.set_status(RowStatus::Success, message);
            row.client = outcome.client;
        }
        Err(err) => {
            row.set_status(RowStatus::Error, err.row_message());
            row.client = None;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::LinkedClient;
    use crate::validation::{classify_candidates, Roster};
    use crate::parser::parse_emails;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What the scripted directory does for one email.
    #[derive(Clone)]
    pub(crate) enum Script {
        Link,
        Reject(&'static str),
        Panic,
        Hang,
    }

    /// In-memory directory that records every call.
    #[derive(Default)]
    pub(crate) struct ScriptedLinker {
        scripts: HashMap<String, Script>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedLinker {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn on(mut self, email: &str, script: Script) -> Self {
            self.scripts.insert(email.to_string(), script);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClientLinker for ScriptedLinker {
        async fn link(&self, email: &str) -> LinkResult<LinkOutcome> {
            self.calls.lock().unwrap().push(email.to_string());
            match self.scripts.get(email).cloned().unwrap_or(Script::Link) {
                Script::Link => Ok(LinkOutcome::linked(LinkedClient {
                    id: format!("id-{}", email),
                    email: email.to_string(),
                    full_name: None,
                })),
                Script::Reject(msg) => Err(LinkError::Rejected(msg.to_string())),
                Script::Panic => panic!("directory exploded"),
                Script::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    pub(crate) fn fast() -> ExecutorOptions {
        ExecutorOptions {
            row_delay: Duration::ZERO,
            link_timeout: None,
        }
    }

    fn rows(content: &str) -> Vec<ImportRow> {
        classify_candidates(&parse_emails(content).unwrap(), &Roster::default())
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(199, 200), 99);
        assert_eq!(progress_percent(200, 201), 99);
        assert_eq!(progress_percent(201, 201), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_only_valid_rows_attempted() {
        let linker = Arc::new(ScriptedLinker::new());
        let executor = Executor::new(linker.clone()).with_options(fast());
        let mut rows = rows("email\na@b.com\nbroken\nA@B.com\nc@d.com");

        let attempted = executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(attempted, 2);
        assert_eq!(linker.calls(), vec!["a@b.com", "c@d.com"]);
        assert_eq!(rows[0].status, RowStatus::Success);
        assert_eq!(rows[0].message, MSG_LINKED);
        assert_eq!(rows[0].client.as_ref().map(|c| c.id.as_str()), Some("id-a@b.com"));
        assert_eq!(rows[1].status, RowStatus::Invalid);
        assert_eq!(rows[2].status, RowStatus::Duplicate);
        assert_eq!(rows[3].status, RowStatus::Success);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort() {
        let linker = Arc::new(
            ScriptedLinker::new()
                .on("b@x.com", Script::Reject("No account with this email"))
                .on("c@x.com", Script::Reject("")),
        );
        let executor = Executor::new(linker.clone()).with_options(fast());
        let mut rows = rows("a@x.com\nb@x.com\nc@x.com\nd@x.com");

        executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(linker.calls().len(), 4);
        assert_eq!(rows[1].status, RowStatus::Error);
        assert_eq!(rows[1].message, "No account with this email");
        assert_eq!(rows[2].message, "Unknown error");
        assert_eq!(rows[3].status, RowStatus::Success);
    }

    #[tokio::test]
    async fn test_panic_becomes_row_error() {
        let linker = Arc::new(ScriptedLinker::new().on("a@x.com", Script::Panic));
        let executor = Executor::new(linker).with_options(fast());
        let mut rows = rows("a@x.com\nb@x.com");

        executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(rows[0].status, RowStatus::Error);
        assert_eq!(rows[0].message, "directory exploded");
        assert_eq!(rows[1].status, RowStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_row_error() {
        let linker = Arc::new(ScriptedLinker::new().on("a@x.com", Script::Hang));
        let executor = Executor::new(linker).with_options(ExecutorOptions {
            row_delay: Duration::ZERO,
            link_timeout: Some(Duration::from_secs(5)),
        });
        let mut rows = rows("a@x.com\nb@x.com");

        executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(rows[0].status, RowStatus::Error);
        assert_eq!(rows[0].message, "Request timed out");
        assert_eq!(rows[1].status, RowStatus::Success);
    }

    #[tokio::test]
    async fn test_progress_reported_per_row() {
        let linker = Arc::new(ScriptedLinker::new().on("b@x.com", Script::Reject("nope")));
        let executor = Executor::new(linker).with_options(fast());
        let mut rows = rows("a@x.com\nbad\nb@x.com\nc@x.com");

        let mut updates: Vec<RowUpdate> = Vec::new();
        executor.run(&mut rows, &mut |u: &RowUpdate| updates.push(u.clone())).await;

        let indexes: Vec<usize> = updates.iter().map(|u| u.index).collect();
        let percents: Vec<u8> = updates.iter().map(|u| u.progress_percent).collect();
        assert_eq!(indexes, vec![0, 2, 3]);
        assert_eq!(percents, vec![33, 67, 100]);
        assert_eq!(updates[1].row.status, RowStatus::Error);
        assert!(updates.iter().all(|u| u.total == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_rows_only() {
        let linker = Arc::new(ScriptedLinker::new());
        let executor = Executor::new(linker).with_options(ExecutorOptions {
            row_delay: Duration::from_millis(300),
            link_timeout: None,
        });
        let mut rows = rows("a@x.com\nb@x.com\nc@x.com");

        let started = tokio::time::Instant::now();
        executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(started.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_nothing_valid_makes_no_calls() {
        let linker = Arc::new(ScriptedLinker::new());
        let executor = Executor::new(linker.clone()).with_options(fast());
        let mut rows = rows("bad\nworse");

        let attempted = executor.run(&mut rows, &mut NoProgress).await;

        assert_eq!(attempted, 0);
        assert!(linker.calls().is_empty());
    }

    #[test]
    fn test_record_result_prefers_directory_message() {
        let mut row = ImportRow::new("a@b.com", 1);
        row.set_status(RowStatus::Valid, "Ready to import");

        record_result(&mut row, Ok(LinkOutcome::default().with_message("Invitation sent")));
        assert_eq!(row.status, RowStatus::Success);
        assert_eq!(row.message, "Invitation sent");
    }
}
