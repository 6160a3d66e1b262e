//! The per-file pipeline: read, transform, guard against empty output,
//! report, write.
//!
//! Every failure is contained in the returned [`FileOutcome`]; a task never
//! affects its siblings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aifmt_core::{ChangeRecord, ContextFile, ReportFlush, RunSettings, Transformed, Transformer};

use crate::error::TaskError;
use crate::report::ReportAccumulator;
use crate::retry::{retry, RetryPolicy};

/// Step of the pipeline a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Transform,
    EmptyResult,
    Write,
    /// The task itself panicked or was cancelled.
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Transform => "transform",
            Stage::EmptyResult => "empty result",
            Stage::Write => "write",
            Stage::Runtime => "runtime",
        })
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// New content was written.
    Succeeded,
    /// The transformer returned the content unchanged; nothing was written.
    Skipped,
    Failed(TaskError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Path-annotated changes proposed for this file. Empty on failure.
    pub changes: Vec<ChangeRecord>,
}

impl FileOutcome {
    pub fn failed(path: PathBuf, error: TaskError) -> Self {
        Self {
            path,
            status: FileStatus::Failed(error),
            changes: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed(_))
    }
}

/// One file's unit of work, owning handles to the run's shared state.
pub struct FileTask {
    path: PathBuf,
    settings: Arc<RunSettings>,
    context: Arc<[ContextFile]>,
    transformer: Arc<dyn Transformer>,
    report: Option<Arc<ReportAccumulator>>,
}

impl FileTask {
    pub fn new(
        path: PathBuf,
        settings: Arc<RunSettings>,
        context: Arc<[ContextFile]>,
        transformer: Arc<dyn Transformer>,
        report: Option<Arc<ReportAccumulator>>,
    ) -> Self {
        Self {
            path,
            settings,
            context,
            transformer,
            report,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drive the file to a terminal state.
    pub async fn run(self) -> FileOutcome {
        tracing::info!(
            path = %self.path.display(),
            language = %self.settings.language,
            model = %self.settings.model,
            context = self.settings.with_context,
            "processing file"
        );

        let outcome = match self.execute().await {
            Ok((status, changes)) => FileOutcome {
                path: self.path.clone(),
                status,
                changes,
            },
            Err(err) => FileOutcome::failed(self.path.clone(), err),
        };

        match &outcome.status {
            FileStatus::Succeeded => tracing::info!(
                path = %outcome.path.display(),
                changes = outcome.changes.len(),
                "file rewritten"
            ),
            FileStatus::Skipped => {
                tracing::info!(path = %outcome.path.display(), "no changes, file left as is")
            }
            FileStatus::Failed(err) => tracing::error!(
                path = %outcome.path.display(),
                stage = %err.stage,
                attempts = err.attempts,
                error = %err.message,
                "file failed"
            ),
        }
        outcome
    }

    async fn execute(&self) -> Result<(FileStatus, Vec<ChangeRecord>), TaskError> {
        let policy = RetryPolicy::for_run(&self.settings);

        let original = retry(policy, |_| tokio::fs::read_to_string(&self.path))
            .await
            .map_err(|e| TaskError::exhausted(Stage::Read, e))?;

        let transform_once = || {
            self.transformer
                .transform(&original, &self.settings, &self.context)
        };

        let transformed = retry(policy, |attempt| {
            if attempt > 1 {
                tracing::info!(path = %self.path.display(), attempt, "retrying transform");
            }
            transform_once()
        })
        .await
        .map_err(|e| TaskError::exhausted(Stage::Transform, e))?;

        let transformed = if transformed.is_empty() {
            self.recover_empty(transform_once).await?
        } else {
            transformed
        };

        let changes: Vec<ChangeRecord> = transformed
            .changes
            .into_iter()
            .map(|change| change.with_path(&self.path))
            .collect();

        if let Some(report) = &self.report {
            self.record_changes(report, changes.clone()).await;
        }

        if transformed.content == original {
            return Ok((FileStatus::Skipped, changes));
        }

        let content = transformed.content;
        retry(policy, |_| tokio::fs::write(&self.path, content.as_bytes()))
            .await
            .map_err(|e| TaskError::exhausted(Stage::Write, e))?;

        Ok((FileStatus::Succeeded, changes))
    }

    /// Ask again, up to `max_retries` times, while the transformer keeps
    /// returning empty content. Errors during this phase count as failed
    /// attempts.
    async fn recover_empty<F, Fut>(&self, mut transform_once: F) -> Result<Transformed, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Transformed, aifmt_core::TransformError>>,
    {
        let path = self.path.display();
        if self.settings.skip_retries {
            return Err(TaskError::new(
                Stage::EmptyResult,
                1,
                "transformer returned empty content",
            ));
        }

        // Set only while the latest re-ask failed outright.
        let mut last_error = None;
        for attempt in 1..=self.settings.max_retries {
            tracing::warn!(%path, attempt, "transformer returned empty content, asking again");
            tokio::time::sleep(self.settings.retry_unit.saturating_mul(attempt)).await;
            match transform_once().await {
                Ok(transformed) if !transformed.is_empty() => return Ok(transformed),
                Ok(_) => last_error = None,
                Err(err) => {
                    tracing::warn!(%path, attempt, error = %err, "transform failed");
                    last_error = Some(err.to_string());
                }
            }
        }

        let message = match last_error {
            Some(err) => format!("transformer kept returning empty content; last attempt failed: {err}"),
            None => "transformer kept returning empty content".to_string(),
        };
        Err(TaskError::new(
            Stage::EmptyResult,
            self.settings.max_retries.saturating_add(1),
            message,
        ))
    }

    async fn record_changes(&self, report: &ReportAccumulator, changes: Vec<ChangeRecord>) {
        let result = match self.settings.report_flush {
            ReportFlush::EachFile => report.append_and_flush(changes).await.map(|_| ()),
            ReportFlush::AtEnd => {
                report.append(changes).await;
                Ok(())
            }
        };
        if let Err(err) = result {
            tracing::warn!(
                path = %self.path.display(),
                report = %report.path().display(),
                error = %err,
                "failed to write report"
            );
        }
    }
}
