//! Many files at once
//!
//! One task per file, bounded by a semaphore. Each file's work runs on the
//! blocking pool and, once started, always runs to completion so its backup
//! invariants hold. Cancellation only stops jobs that have not started.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ops;
use crate::relocate::RelocationRequest;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchJob {
    Relocate { path: PathBuf, request: RelocationRequest },
    Validate { path: PathBuf },
}

impl BatchJob {
    pub fn path(&self) -> &Path {
        match self {
            Self::Relocate { path, .. } | Self::Validate { path } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    /// Succeeded with diagnostics attached
    Warned,
    Failed,
    /// Cancelled before it started
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub warnings: usize,
    pub detail: Option<String>,
    pub backup_path: Option<PathBuf>,
}

impl FileOutcome {
    fn new(path: &Path, status: FileStatus) -> Self {
        Self { path: path.to_path_buf(), status, warnings: 0, detail: None, backup_path: None }
    }

    fn failed(path: &Path, detail: impl Into<String>) -> Self {
        Self { detail: Some(detail.into()), ..Self::new(path, FileStatus::Failed) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// One entry per job, in submission order
    pub outcomes: Vec<FileOutcome>,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<FileOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in &outcomes {
            match outcome.status {
                FileStatus::Succeeded => report.succeeded += 1,
                FileStatus::Warned => report.warned += 1,
                FileStatus::Failed => report.failed += 1,
                FileStatus::Skipped => report.skipped += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }
}

/// Stops jobs that have not started yet
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchRunner {
    config: Arc<Config>,
    concurrency: usize,
    cancel: CancelHandle,
}

impl BatchRunner {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config, concurrency: DEFAULT_CONCURRENCY, cancel: CancelHandle::default() }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run every job and report one outcome per job. Fails only when the
    /// job list names the same path twice, in which case nothing runs.
    pub async fn run(&self, jobs: Vec<BatchJob>) -> Result<BatchReport> {
        let mut seen = HashSet::new();
        for job in &jobs {
            if !seen.insert(identity(job.path())) {
                tracing::warn!(path = %job.path().display(), "duplicate job rejected");
                return Err(Error::DuplicateJob(job.path().to_path_buf()));
            }
        }

        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<(usize, FileOutcome)>(total.max(1));

        for (seq, job) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let tx = tx.clone();
            let config = self.config.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) if !cancel.is_cancelled() => {
                        let path = job.path().to_path_buf();
                        tokio::task::spawn_blocking(move || run_job(&job, &config))
                            .await
                            .unwrap_or_else(|err| FileOutcome::failed(&path, format!("worker panicked: {err}")))
                    }
                    _ => FileOutcome::new(job.path(), FileStatus::Skipped),
                };
                // receiver outlives every sender
                let _ = tx.send((seq, outcome)).await;
            });
        }
        drop(tx);

        let mut collected = Vec::with_capacity(total);
        while let Some(item) = rx.recv().await {
            collected.push(item);
        }
        collected.sort_by_key(|(seq, _)| *seq);

        let report = BatchReport::from_outcomes(collected.into_iter().map(|(_, o)| o).collect());
        tracing::info!(
            succeeded = report.succeeded,
            warned = report.warned,
            failed = report.failed,
            skipped = report.skipped,
            "batch finished"
        );
        Ok(report)
    }
}

/// Key under which two job paths count as the same file. Paths that cannot
/// be canonicalized (missing files) fall back to their normalized components.
fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.components().collect())
}

fn run_job(job: &BatchJob, config: &Config) -> FileOutcome {
    let path = job.path();
    match job {
        BatchJob::Relocate { request, .. } => match ops::relocate(path, request, config) {
            Ok(result) if result.success => {
                let warnings = result.diagnostics.warnings().count();
                FileOutcome {
                    warnings,
                    backup_path: Some(result.backup_path),
                    ..FileOutcome::new(path, if warnings > 0 { FileStatus::Warned } else { FileStatus::Succeeded })
                }
            }
            Ok(result) => FileOutcome {
                backup_path: Some(result.backup_path),
                ..FileOutcome::failed(path, result.failure.unwrap_or_default())
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "relocation refused");
                FileOutcome::failed(path, err.to_string())
            }
        },
        BatchJob::Validate { .. } => match ops::validate(path, config) {
            Ok(report) if report.passes(config.misaligned_tolerance) => {
                let warnings = report.warnings.len();
                FileOutcome {
                    warnings,
                    ..FileOutcome::new(path, if warnings > 0 { FileStatus::Warned } else { FileStatus::Succeeded })
                }
            }
            Ok(report) => FileOutcome::failed(path, report.failure_reason(config.misaligned_tolerance)),
            Err(err) => FileOutcome::failed(path, err.to_string()),
        },
    }
}
