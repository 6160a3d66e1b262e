//! Error types for aifmt-engine.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::task::Stage;

/// A run-level precondition that does not hold. Nothing is touched when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("API token is not configured; run `aifmt set api_key <token>` first")]
    MissingToken,

    #[error("no programming language given; pass --language <LANGUAGE>")]
    MissingLanguage,

    #[error("no files given to process")]
    NoPatterns,

    #[error("report mode needs a comments language; run `aifmt set comments_language <LANGUAGE>`")]
    MissingCommentsLanguage,
}

/// Every attempt allowed by a [`crate::RetryPolicy`] failed.
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last)
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Terminal failure of one file task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed after {attempts} attempt(s): {message}")]
pub struct TaskError {
    pub stage: Stage,
    pub attempts: u32,
    pub message: String,
}

impl TaskError {
    pub fn new(stage: Stage, attempts: u32, message: impl Into<String>) -> Self {
        Self {
            stage,
            attempts,
            message: message.into(),
        }
    }

    pub(crate) fn exhausted<E: fmt::Display>(stage: Stage, err: RetryError<E>) -> Self {
        Self::new(stage, err.attempts, err.last.to_string())
    }
}

/// Failure writing the report artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.into(),
        source,
    }
}

/// A command-line pattern that could not be expanded.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("malformed pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
