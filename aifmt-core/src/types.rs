//! Domain types for a formatting run.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Records that end up in the report artifact are serializable via serde.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model used when neither the command line nor the config names one.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat:free";

/// Retry budget used when the config file does not set `max_retry`.
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Base unit for linear backoff between attempts.
pub const DEFAULT_RETRY_UNIT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Shared, immutable run inputs
// ---------------------------------------------------------------------------

/// A file supplied as read-only background material to the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: PathBuf,
    pub content: String,
}

/// One described edit proposed for a file.
///
/// Serialized into the report as `{path, codeFragment, description}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Empty until the owning file task stamps it.
    #[serde(default)]
    pub path: PathBuf,
    pub code_fragment: String,
    pub description: String,
}

impl ChangeRecord {
    pub fn new(code_fragment: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            code_fragment: code_fragment.into(),
            description: description.into(),
        }
    }

    /// Return the record annotated with `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

/// Output of a transformer call: the full replacement content and the edits
/// it is made of.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transformed {
    pub content: String,
    pub changes: Vec<ChangeRecord>,
}

impl Transformed {
    /// A reply with nothing but whitespace counts as empty and must never be
    /// written over a file.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Run settings
// ---------------------------------------------------------------------------

/// When the report accumulator writes its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFlush {
    /// Write once after every file task has finished.
    #[default]
    AtEnd,
    /// Rewrite the whole accumulated list after every file that reports.
    EachFile,
}

/// Immutable configuration governing one batch run.
///
/// Built once from the config store and the command line, then shared
/// read-only by every file task.
#[derive(Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub language: String,
    pub model: String,
    pub token: String,
    pub comments: bool,
    pub comments_language: String,
    pub with_context: bool,
    pub report: bool,
    pub skip_retries: bool,
    pub max_retries: u32,
    pub retry_unit: Duration,
    /// `None` launches every file task at once.
    pub max_concurrency: Option<usize>,
    pub report_flush: ReportFlush,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            language: String::new(),
            model: DEFAULT_MODEL.to_string(),
            token: String::new(),
            comments: false,
            comments_language: String::new(),
            with_context: false,
            report: false,
            skip_retries: false,
            max_retries: DEFAULT_MAX_RETRY,
            retry_unit: DEFAULT_RETRY_UNIT,
            max_concurrency: None,
            report_flush: ReportFlush::default(),
        }
    }
}

impl fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("RunSettings")
            .field("language", &self.language)
            .field("model", &self.model)
            .field("token", &token)
            .field("comments", &self.comments)
            .field("comments_language", &self.comments_language)
            .field("with_context", &self.with_context)
            .field("report", &self.report)
            .field("skip_retries", &self.skip_retries)
            .field("max_retries", &self.max_retries)
            .field("retry_unit", &self.retry_unit)
            .field("max_concurrency", &self.max_concurrency)
            .field("report_flush", &self.report_flush)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
