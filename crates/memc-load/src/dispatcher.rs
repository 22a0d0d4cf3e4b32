//! Pipeline dispatcher
//!
//! Feeds file paths through a bounded FIFO queue to a fixed pool of file
//! processors, then marks every input file as processed by prefixing its name
//! with a dot. Marking happens for every file, whatever its verdict, once the
//! whole pool has finished.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::models::{FileReport, Verdict};
use crate::processor::FileProcessor;

/// A file skipped without a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened to one file inside the pool
#[derive(Debug)]
pub enum FileOutcome {
    Loaded(FileReport),
    Abandoned(AbandonedFile),
}

/// Result of one dispatcher run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files that were fully scanned, in completion order
    pub reports: Vec<FileReport>,
    /// Files skipped because they could not be opened or decoded
    pub abandoned: Vec<AbandonedFile>,
    /// New names of files marked as processed
    pub marked: Vec<PathBuf>,
    pub marking_failures: usize,
}

impl RunSummary {
    pub fn accepted(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict() == Verdict::Accepted)
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.reports.len() - self.accepted()
    }
}

/// Path a processed file is renamed to: `dir/name` -> `dir/.name`
pub fn dotted_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let mut dotted = std::ffi::OsString::from(".");
    dotted.push(name);
    Some(path.with_file_name(dotted))
}

/// Mark `path` as processed, returning its new location
pub fn dot_rename(path: &Path) -> io::Result<PathBuf> {
    let target = dotted_path(path).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    std::fs::rename(path, &target)?;
    Ok(target)
}

/// Runs a bounded pool of [`FileProcessor`]s over a list of files
pub struct Dispatcher {
    processor: Arc<FileProcessor>,
    concurrency_limit: usize,
    queue_capacity: usize,
}

impl Dispatcher {
    pub fn new(processor: FileProcessor, concurrency_limit: usize, queue_capacity: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            concurrency_limit: concurrency_limit.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Pool size for `file_count` files
    pub fn pool_size(&self, file_count: usize) -> usize {
        file_count.min(self.concurrency_limit)
    }

    /// Process every file, then mark all of them as handled
    pub async fn run(&self, files: Vec<PathBuf>) -> RunSummary {
        let pool_size = self.pool_size(files.len());
        info!(files = files.len(), workers = pool_size, "Starting file pool");

        let (tx, rx) = mpsc::channel::<PathBuf>(self.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for worker_id in 0..pool_size {
            pool.spawn(pool_worker(worker_id, rx.clone(), self.processor.clone()));
        }

        for path in &files {
            if tx.send(path.clone()).await.is_err() {
                error!(path = %path.display(), "File pool stopped before all files were queued");
                break;
            }
        }
        drop(tx);

        let mut summary = RunSummary::default();
        while let Some(result) = pool.join_next().await {
            match result {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            FileOutcome::Loaded(report) => summary.reports.push(report),
                            FileOutcome::Abandoned(file) => summary.abandoned.push(file),
                        }
                    }
                },
                Err(e) => error!(error = %e, "File pool worker panicked"),
            }
        }

        // every discovered file is marked, loaded or not
        for path in &files {
            match dot_rename(path) {
                Ok(target) => {
                    debug!(from = %path.display(), to = %target.display(), "Marked as processed");
                    summary.marked.push(target);
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to mark file as processed");
                    summary.marking_failures += 1;
                },
            }
        }

        info!(
            loaded = summary.reports.len(),
            accepted = summary.accepted(),
            rejected = summary.rejected(),
            abandoned = summary.abandoned.len(),
            marking_failures = summary.marking_failures,
            "Run finished"
        );

        summary
    }
}

async fn pool_worker(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    processor: Arc<FileProcessor>,
) -> Vec<FileOutcome> {
    let mut outcomes = Vec::new();

    loop {
        // the lock is released before the file is processed
        let next = queue.lock().await.recv().await;
        let Some(path) = next else {
            break;
        };

        info!(worker_id, path = %path.display(), "Processing file");
        match processor.process(&path).await {
            Ok(report) => outcomes.push(FileOutcome::Loaded(report)),
            Err(e) => {
                error!(worker_id, path = %path.display(), error = %e, "Abandoning file");
                outcomes.push(FileOutcome::Abandoned(AbandonedFile {
                    path,
                    reason: e.to_string(),
                }));
            },
        }
    }

    outcomes
}
