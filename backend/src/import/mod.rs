//! Import workflow.
//!
//! - Executor: sequential, throttled directory calls
//! - Summary: final counts
//! - Session: upload → preview → importing → complete
//! - Report / Template: downloadable CSV files

pub mod executor;
pub mod report;
pub mod session;
pub mod summary;
pub mod template;

pub use executor::{
    progress_percent, record_result, Executor, ExecutorOptions, NoProgress, ProgressSink, RowUpdate,
    DEFAULT_LINK_TIMEOUT, DEFAULT_ROW_DELAY,
};
pub use report::{report_csv, report_filename, write_report};
pub use session::{ImportRun, ImportSession};
pub use summary::summarize;
pub use template::{template_csv, TEMPLATE_FILENAME};
