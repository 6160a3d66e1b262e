//! Full runs of the orchestrator against a scripted transformer.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use tempfile::TempDir;

use aifmt_core::{
    ChangeRecord, ContextFile, ReportFlush, RunSettings, TransformError, Transformed, Transformer,
};
use aifmt_engine::{FileStatus, Orchestrator, PreconditionError, Stage};

// ---------------------------------------------------------------------------
// Scripted transformer
// ---------------------------------------------------------------------------

type Respond = dyn Fn(&str, u32) -> Result<Transformed, TransformError> + Send + Sync;

/// Answers with `respond(content, nth_call_for_that_content)` and records
/// what it was asked.
struct Scripted {
    respond: Box<Respond>,
    calls: Mutex<HashMap<String, u32>>,
    context_sizes: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl Scripted {
    fn new(
        respond: impl Fn(&str, u32) -> Result<Transformed, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(HashMap::new()),
            context_sizes: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self, content: &str) -> u32 {
        self.calls.lock().unwrap().get(content).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transformer for Scripted {
    async fn transform(
        &self,
        content: &str,
        _settings: &RunSettings,
        context: &[ContextFile],
    ) -> Result<Transformed, TransformError> {
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(content.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.context_sizes.lock().unwrap().push(context.len());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.respond)(content, nth)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rewritten() -> Transformed {
    Transformed {
        content: "X".to_string(),
        changes: vec![ChangeRecord::new("func main() {}", "reformatted main")],
    }
}

fn empty() -> Transformed {
    Transformed::default()
}

fn settings() -> RunSettings {
    RunSettings {
        token: "sk-test".to_string(),
        language: "go".to_string(),
        max_retries: 5,
        retry_unit: Duration::from_millis(1),
        ..RunSettings::default()
    }
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn glob(dir: &TempDir, rest: &str) -> Vec<String> {
    vec![format!("{}/{rest}", dir.path().display())]
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

fn report_files(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("report_"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_file_rewritten_and_reported() {
    let dir = workspace(&[("a.go", "package a"), ("b.go", "package b")]);
    let reports = TempDir::new().unwrap();
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .with_report_dir(reports.path())
        .with_started_at(Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap())
        .run(&[glob(&dir, "a.go"), glob(&dir, "b.go")].concat())
        .await
        .unwrap();

    assert_eq!(read(&dir, "a.go"), "X");
    assert_eq!(read(&dir, "b.go"), "X");
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.outcomes[0].path, dir.path().join("a.go"));

    let report = summary.report.expect("report summary");
    assert_eq!(report.path, reports.path().join("report_2026-01-02_03:04:05.json"));
    assert_eq!(report.records, 2);
    assert!(report.error.is_none());

    let written: Vec<ChangeRecord> =
        serde_json::from_str(&fs::read_to_string(&report.path).unwrap()).unwrap();
    let mut paths: Vec<_> = written.iter().map(|r| r.path.clone()).collect();
    paths.sort();
    assert_eq!(paths, vec![dir.path().join("a.go"), dir.path().join("b.go")]);
    assert!(written.iter().all(|r| r.description == "reformatted main"));
}

#[tokio::test]
async fn transient_error_then_success_takes_two_calls() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, nth| {
        if nth == 1 {
            Err(TransformError::Transport("connection reset".to_string()))
        } else {
            Ok(rewritten())
        }
    }));
    let run = RunSettings {
        max_retries: 3,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(stub.calls("package a"), 2);
    assert_eq!(summary.outcomes[0].status, FileStatus::Succeeded);
    assert_eq!(read(&dir, "a.go"), "X");
}

#[tokio::test]
async fn persistent_errors_exhaust_the_budget() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| {
        Err(TransformError::Status {
            status: 500,
            body: "down".to_string(),
        })
    }));
    let run = RunSettings {
        max_retries: 3,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(stub.calls("package a"), 3);
    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected failure, got {:?}", summary.outcomes[0].status);
    };
    assert_eq!(err.stage, Stage::Transform);
    assert_eq!(err.attempts, 3);
    assert_eq!(read(&dir, "a.go"), "package a");
}

#[tokio::test]
async fn always_empty_result_fails_without_writing() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(empty())));
    let run = RunSettings {
        max_retries: 2,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    // One initial call plus two retries.
    assert_eq!(stub.calls("package a"), 3);
    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected failure");
    };
    assert_eq!(err.stage, Stage::EmptyResult);
    assert_eq!(read(&dir, "a.go"), "package a");
}

#[tokio::test]
async fn empty_result_recovers_on_a_later_call() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, nth| {
        if nth < 3 {
            Ok(empty())
        } else {
            Ok(rewritten())
        }
    }));

    let summary = Orchestrator::new(settings(), stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(stub.calls("package a"), 3);
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(read(&dir, "a.go"), "X");
}

#[tokio::test]
async fn skip_mode_makes_one_attempt_and_spares_siblings() {
    let dir = workspace(&[("a.go", "package a"), ("b.go", "package b")]);
    let stub = Arc::new(Scripted::new(|content, _| {
        if content == "package a" {
            Err(TransformError::Transport("refused".to_string()))
        } else {
            Ok(rewritten())
        }
    }));
    let run = RunSettings {
        skip_retries: true,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    assert_eq!(stub.calls("package a"), 1);
    assert_eq!(read(&dir, "a.go"), "package a");
    assert_eq!(read(&dir, "b.go"), "X");
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.succeeded(), 1);
}

#[tokio::test]
async fn skip_mode_empty_result_is_a_single_call() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(empty())));
    let run = RunSettings {
        skip_retries: true,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(stub.total_calls(), 1);
    assert_eq!(summary.failed(), 1);
}

#[tokio::test]
async fn unmatched_patterns_touch_nothing() {
    let dir = workspace(&[("a.go", "package a")]);
    let reports = TempDir::new().unwrap();
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        ..settings()
    };
    let mut patterns = glob(&dir, "*.rs");
    patterns.extend(glob(&dir, "missing/*.go"));

    let summary = Orchestrator::new(run, stub.clone())
        .with_report_dir(reports.path())
        .run(&patterns)
        .await
        .unwrap();

    assert!(summary.is_empty());
    assert!(summary.report.is_none());
    assert_eq!(stub.total_calls(), 0);
    assert_eq!(read(&dir, "a.go"), "package a");
    assert!(report_files(reports.path()).is_empty());
}

#[tokio::test]
async fn failed_precondition_touches_nothing() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        token: String::new(),
        ..settings()
    };

    let err = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap_err();

    assert_eq!(err, PreconditionError::MissingToken);
    assert_eq!(stub.total_calls(), 0);
    assert_eq!(read(&dir, "a.go"), "package a");
}

#[tokio::test]
async fn identical_output_is_skipped_but_reported() {
    let dir = workspace(&[("a.go", "package a")]);
    let reports = TempDir::new().unwrap();
    let stub = Arc::new(Scripted::new(|content, _| {
        Ok(Transformed {
            content: content.to_string(),
            changes: vec![ChangeRecord::new("package a", "already tidy")],
        })
    }));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .with_report_dir(reports.path())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(summary.outcomes[0].status, FileStatus::Skipped);
    assert_eq!(summary.report.unwrap().records, 1);
}

#[tokio::test]
async fn unreadable_file_fails_at_read() {
    let dir = workspace(&[("ok.go", "package ok")]);
    fs::write(dir.path().join("bad.go"), [0xffu8, 0xfe, 0xfd]).unwrap();
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        max_retries: 2,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected bad.go to fail");
    };
    assert_eq!(err.stage, Stage::Read);
    assert_eq!(err.attempts, 2);
    assert_eq!(summary.outcomes[1].status, FileStatus::Succeeded);
    assert_eq!(stub.total_calls(), 1);
}

#[tokio::test]
async fn unreadable_file_in_skip_mode_is_read_once() {
    let dir = workspace(&[]);
    fs::write(dir.path().join("bad.go"), [0xffu8, 0xfe, 0xfd]).unwrap();
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        skip_retries: true,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "bad.go"))
        .await
        .unwrap();

    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected bad.go to fail");
    };
    assert_eq!(err.stage, Stage::Read);
    assert_eq!(err.attempts, 1);
    assert_eq!(stub.total_calls(), 0);
}

/// Swaps the target file for a directory before answering, so the write
/// that follows cannot succeed.
fn blocks_write(dir: &TempDir, name: &str) -> Scripted {
    let target = dir.path().join(name);
    Scripted::new(move |_, _| {
        fs::remove_file(&target).unwrap();
        fs::create_dir(&target).unwrap();
        Ok(rewritten())
    })
}

#[tokio::test]
async fn write_failure_exhausts_the_budget() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(blocks_write(&dir, "a.go"));
    let run = RunSettings {
        max_retries: 3,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected failure, got {:?}", summary.outcomes[0].status);
    };
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.attempts, 3);
    assert_eq!(stub.total_calls(), 1);
}

#[tokio::test]
async fn write_failure_in_skip_mode_is_a_single_attempt() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(blocks_write(&dir, "a.go"));
    let run = RunSettings {
        skip_retries: true,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected failure, got {:?}", summary.outcomes[0].status);
    };
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.attempts, 1);
}

#[tokio::test]
async fn empty_then_errors_keeps_the_last_error() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, nth| {
        if nth == 1 {
            Ok(empty())
        } else {
            Err(TransformError::Transport("gateway timeout".to_string()))
        }
    }));
    let run = RunSettings {
        max_retries: 2,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(stub.calls("package a"), 3);
    let FileStatus::Failed(err) = &summary.outcomes[0].status else {
        panic!("expected failure, got {:?}", summary.outcomes[0].status);
    };
    assert_eq!(err.stage, Stage::EmptyResult);
    assert_eq!(err.attempts, 3);
    assert!(err.message.contains("gateway timeout"), "message was {}", err.message);
    assert_eq!(read(&dir, "a.go"), "package a");
}

#[tokio::test]
async fn report_save_failure_is_surfaced_without_failing_files() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        ..settings()
    };

    let summary = Orchestrator::new(run, stub)
        .with_report_dir(dir.path().join("missing"))
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(read(&dir, "a.go"), "X");
    let report = summary.report.expect("report summary");
    assert_eq!(report.records, 1);
    assert!(report.error.is_some());
}

#[tokio::test]
async fn each_file_flush_failure_does_not_fail_the_file() {
    let dir = workspace(&[("a.go", "package a")]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        report_flush: ReportFlush::EachFile,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub)
        .with_report_dir(dir.path().join("missing"))
        .run(&glob(&dir, "a.go"))
        .await
        .unwrap();

    assert_eq!(summary.outcomes[0].status, FileStatus::Succeeded);
    assert_eq!(read(&dir, "a.go"), "X");
    assert!(summary.report.expect("report summary").error.is_some());
}

#[tokio::test]
async fn context_mode_shares_every_file() {
    let dir = workspace(&[
        ("a.go", "package a"),
        ("b.go", "package b"),
        ("c.go", "package c"),
    ]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        with_context: true,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    assert_eq!(summary.context_files, 3);
    assert_eq!(*stub.context_sizes.lock().unwrap(), vec![3, 3, 3]);
}

#[tokio::test]
async fn each_file_flush_leaves_complete_report() {
    let dir = workspace(&[("a.go", "package a"), ("b.go", "package b")]);
    let reports = TempDir::new().unwrap();
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())));
    let run = RunSettings {
        report: true,
        comments_language: "English".to_string(),
        report_flush: ReportFlush::EachFile,
        ..settings()
    };

    let summary = Orchestrator::new(run, stub)
        .with_report_dir(reports.path())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    let files = report_files(reports.path());
    assert_eq!(files.len(), 1);
    let written: Vec<ChangeRecord> =
        serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(summary.report.unwrap().records, 2);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let dir = workspace(&[
        ("a.go", "package a"),
        ("b.go", "package b"),
        ("c.go", "package c"),
        ("d.go", "package d"),
    ]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())).with_delay(Duration::from_millis(20)));
    let run = RunSettings {
        max_concurrency: Some(1),
        ..settings()
    };

    let summary = Orchestrator::new(run, stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 4);
    assert_eq!(stub.peak(), 1);
}

#[tokio::test]
async fn unbounded_run_overlaps_tasks() {
    let dir = workspace(&[
        ("a.go", "package a"),
        ("b.go", "package b"),
        ("c.go", "package c"),
        ("d.go", "package d"),
    ]);
    let stub = Arc::new(Scripted::new(|_, _| Ok(rewritten())).with_delay(Duration::from_millis(200)));

    Orchestrator::new(settings(), stub.clone())
        .run(&glob(&dir, "*.go"))
        .await
        .unwrap();

    assert!(stub.peak() > 1, "peak in-flight was {}", stub.peak());
}
