//! # aifmt-engine
//!
//! Concurrent batch orchestration: expand patterns, run one [`task::FileTask`]
//! per file, retry every fallible step, and collect change records.
//!
//! Call [`Orchestrator::run`] with the command-line patterns; the returned
//! [`RunSummary`] lists one [`FileOutcome`] per resolved file.

pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod patterns;
pub mod report;
pub mod retry;
pub mod task;

pub use error::{PatternError, PreconditionError, ReportError, RetryError, TaskError};
pub use orchestrator::{validate, Orchestrator, ReportSummary, RunSummary};
pub use report::ReportAccumulator;
pub use retry::{retry, RetryPolicy};
pub use task::{FileOutcome, FileStatus, FileTask, Stage};
