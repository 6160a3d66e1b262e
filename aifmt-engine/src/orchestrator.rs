//! Batch orchestration: validate, expand, fan out one task per file, wait
//! for all of them, flush the report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use aifmt_core::{ContextFile, RunSettings, Transformer};

use crate::error::{PreconditionError, TaskError};
use crate::patterns;
use crate::report::ReportAccumulator;
use crate::task::{FileOutcome, FileStatus, FileTask, Stage};

/// Check run-level preconditions, in the order they are reported.
pub fn validate(settings: &RunSettings, patterns: &[String]) -> Result<(), PreconditionError> {
    if settings.token.trim().is_empty() {
        return Err(PreconditionError::MissingToken);
    }
    if settings.language.trim().is_empty() {
        return Err(PreconditionError::MissingLanguage);
    }
    if patterns.is_empty() {
        return Err(PreconditionError::NoPatterns);
    }
    if settings.report && settings.comments_language.trim().is_empty() {
        return Err(PreconditionError::MissingCommentsLanguage);
    }
    Ok(())
}

/// Where the report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub records: usize,
    /// Set when the final flush failed; the run itself still completes.
    pub error: Option<String>,
}

/// Result of one batch run, outcomes in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    pub context_files: usize,
    pub report: Option<ReportSummary>,
}

impl RunSummary {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Succeeded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Runs every resolved file through a [`FileTask`] concurrently.
pub struct Orchestrator {
    settings: Arc<RunSettings>,
    transformer: Arc<dyn Transformer>,
    report_dir: PathBuf,
    started_at: DateTime<Local>,
}

impl Orchestrator {
    /// Reports go to the current directory, stamped with the current time.
    pub fn new(settings: RunSettings, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            settings: Arc::new(settings),
            transformer,
            report_dir: PathBuf::from("."),
            started_at: Local::now(),
        }
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Process every file matched by `patterns` and wait for all of them.
    ///
    /// Only a failed precondition is an error. Per-file failures are in the
    /// returned summary.
    pub async fn run(&self, patterns: &[String]) -> Result<RunSummary, PreconditionError> {
        validate(&self.settings, patterns)?;

        let files = patterns::expand_all(patterns);
        if files.is_empty() {
            tracing::warn!("no files matched");
            return Ok(RunSummary::default());
        }

        let context: Arc<[ContextFile]> = if self.settings.with_context {
            let loaded = load_context(&files).await;
            tracing::info!(files = loaded.len(), "loaded context");
            loaded.into()
        } else {
            Arc::from(Vec::new())
        };

        let report = self
            .settings
            .report
            .then(|| Arc::new(ReportAccumulator::new(&self.report_dir, self.started_at)));

        let outcomes = self.run_tasks(&files, &context, report.as_ref()).await;

        let report = match report {
            Some(report) => Some(finish_report(&report).await),
            None => None,
        };

        let summary = RunSummary {
            outcomes,
            context_files: context.len(),
            report,
        };
        tracing::info!(
            files = summary.outcomes.len(),
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "run finished"
        );
        Ok(summary)
    }

    async fn run_tasks(
        &self,
        files: &[PathBuf],
        context: &Arc<[ContextFile]>,
        report: Option<&Arc<ReportAccumulator>>,
    ) -> Vec<FileOutcome> {
        let limiter = self
            .settings
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        let mut set = JoinSet::new();
        for (index, path) in files.iter().enumerate() {
            let task = FileTask::new(
                path.clone(),
                Arc::clone(&self.settings),
                Arc::clone(context),
                Arc::clone(&self.transformer),
                report.cloned(),
            );
            let limiter = limiter.clone();
            set.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                (index, task.run().await)
            });
        }

        let mut slots: Vec<Option<FileOutcome>> = (0..files.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(err) => tracing::error!(error = %err, "file task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(files)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    FileOutcome::failed(
                        path.clone(),
                        TaskError::new(Stage::Runtime, 1, "task panicked or was cancelled"),
                    )
                })
            })
            .collect()
    }
}

/// Read every resolved file as context. Unreadable files are left out.
async fn load_context(files: &[PathBuf]) -> Vec<ContextFile> {
    let mut context = Vec::with_capacity(files.len());
    for path in files {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => context.push(ContextFile {
                path: path.clone(),
                content,
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable context file")
            }
        }
    }
    context
}

async fn finish_report(report: &ReportAccumulator) -> ReportSummary {
    let path: &Path = report.path();
    match report.flush().await {
        Ok(records) => {
            tracing::info!(path = %path.display(), records, "report saved");
            ReportSummary {
                path: path.to_path_buf(),
                records,
                error: None,
            }
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to save report");
            ReportSummary {
                path: path.to_path_buf(),
                records: report.len().await,
                error: Some(err.to_string()),
            }
        }
    }
}
