//! Shared, append-only collection of change records and its JSON artifact.
//!
//! Many file tasks append concurrently. Every append (and every flush) holds
//! the same lock, so records are never lost and a flush always serialises a
//! consistent prefix of the appends made so far.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;

use aifmt_core::ChangeRecord;

use crate::error::{io_err, ReportError};

/// Name of the artifact for a run that started at `started_at`.
pub fn report_file_name(started_at: DateTime<Local>) -> String {
    format!("report_{}.json", started_at.format("%Y-%m-%d_%H:%M:%S"))
}

/// Accumulates [`ChangeRecord`]s for one run and writes them to
/// `<dir>/report_<date>_<time>.json`.
#[derive(Debug)]
pub struct ReportAccumulator {
    path: PathBuf,
    records: Mutex<Vec<ChangeRecord>>,
}

impl ReportAccumulator {
    pub fn new(dir: &Path, started_at: DateTime<Local>) -> Self {
        Self {
            path: dir.join(report_file_name(started_at)),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Destination of the artifact. Nothing exists there until the first flush.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`; returns the total held afterwards.
    pub async fn append(&self, records: Vec<ChangeRecord>) -> usize {
        let mut guard = self.records.lock().await;
        guard.extend(records);
        guard.len()
    }

    /// Append `records` and rewrite the artifact in the same critical section.
    pub async fn append_and_flush(&self, records: Vec<ChangeRecord>) -> Result<usize, ReportError> {
        let mut guard = self.records.lock().await;
        guard.extend(records);
        write_records(&self.path, &guard).await?;
        Ok(guard.len())
    }

    /// Write every record appended so far; returns how many were written.
    pub async fn flush(&self) -> Result<usize, ReportError> {
        let guard = self.records.lock().await;
        write_records(&self.path, &guard).await?;
        Ok(guard.len())
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Copy of the records appended so far, in append order.
    pub async fn snapshot(&self) -> Vec<ChangeRecord> {
        self.records.lock().await.clone()
    }
}

/// Serialise and atomically replace the artifact (tmp sibling, then rename).
async fn write_records(path: &Path, records: &[ChangeRecord]) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(records)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| io_err(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_err(path, e))?;
    tracing::debug!(path = %path.display(), records = records.len(), "report written");
    Ok(())
}
