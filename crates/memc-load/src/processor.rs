//! File processor
//!
//! Loads one gzip-compressed installed-apps log:
//!
//! 1. open the file and check the gzip header (concatenated gzip members are
//!    read as one stream)
//! 2. start one bounded queue and one [`UploadWorker`] per destination class
//! 3. scan lines on the blocking pool, parse, serialize and enqueue
//! 4. close the queues, collect one outcome per worker
//! 5. compute the error rate and log the verdict
//!
//! A full queue blocks the scanner of that file only. Open and decode failures
//! abandon the file; bad lines, unknown device types and failed writes are
//! only counted.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::LoaderConfig;
use crate::models::{FileReport, UploadItem, UploadOutcome, Verdict, NORMAL_ERROR_RATE};
use crate::parser::parse_installed_apps;
use crate::serializer::serialize_installed_apps;
use crate::store::Destinations;
use crate::uploader::UploadWorker;

/// Reasons a whole file is abandoned without a verdict
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decompress {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scanner task failed: {0}")]
    Scanner(#[from] tokio::task::JoinError),
}

type GzipLines = BufReader<MultiGzDecoder<File>>;

/// Counters kept by the scanning side of a file
#[derive(Debug, Default)]
struct ScanStats {
    lines: u64,
    errors: u64,
    read_error: Option<io::Error>,
}

/// Runs the load of a single file
#[derive(Debug, Clone)]
pub struct FileProcessor {
    destinations: Arc<Destinations>,
    retry_limit: u32,
    queue_capacity: usize,
}

impl FileProcessor {
    pub fn new(destinations: Arc<Destinations>, retry_limit: u32, queue_capacity: usize) -> Self {
        Self {
            destinations,
            retry_limit,
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn from_config(config: &LoaderConfig, destinations: Arc<Destinations>) -> Self {
        Self::new(destinations, config.retry_limit, config.queue_capacity)
    }

    /// Load `path` into the stores and return its totals
    pub async fn process(&self, path: &Path) -> Result<FileReport, ProcessError> {
        let owned = path.to_path_buf();
        let reader = tokio::task::spawn_blocking(move || open_gzip(&owned)).await??;

        let mut queues = HashMap::with_capacity(self.destinations.len());
        let mut workers = JoinSet::new();
        for (class, store) in self.destinations.iter() {
            let (tx, rx) = mpsc::channel(self.queue_capacity);
            queues.insert(class.to_string(), tx);
            workers.spawn(UploadWorker::new(class, store.clone(), self.retry_limit).run(rx));
        }

        debug!(path = %path.display(), workers = workers.len(), "Scanning file");

        // the scanner owns the senders; they are dropped when it returns,
        // which closes every queue
        let scanned = tokio::task::spawn_blocking(move || scan_lines(reader, queues)).await;
        let uploaded = collect_outcomes(&mut workers, self.destinations.len()).await;

        let stats = scanned?;
        if let Some(source) = stats.read_error {
            warn!(
                path = %path.display(),
                lines = stats.lines,
                processed = uploaded.processed,
                "Stream broke off after partial load"
            );
            return Err(ProcessError::Decode {
                path: path.to_path_buf(),
                source,
            });
        }

        let report = FileReport {
            path: path.to_path_buf(),
            processed: uploaded.processed,
            errors: uploaded.errors + stats.errors,
        };
        log_verdict(&report, stats.lines);

        Ok(report)
    }
}

fn open_gzip(path: &Path) -> Result<GzipLines, ProcessError> {
    let file = File::open(path).map_err(|source| ProcessError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    // pulls the gzip header and first block so a non-gzip file fails here
    reader.fill_buf().map_err(|source| ProcessError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(reader)
}

fn strip_line(raw: &[u8]) -> Option<&str> {
    std::str::from_utf8(raw)
        .ok()
        .map(|line| line.trim_matches(|c| c == ' ' || c == '\r' || c == '\n'))
}

/// Blocking scan loop; must run on the blocking pool
fn scan_lines<R: BufRead>(
    mut reader: R,
    queues: HashMap<String, mpsc::Sender<UploadItem>>,
) -> ScanStats {
    let mut stats = ScanStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                stats.read_error = Some(e);
                break;
            },
        }

        let Some(line) = strip_line(&buf) else {
            stats.lines += 1;
            stats.errors += 1;
            debug!("Skipping line that is not valid UTF-8");
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let record = match parse_installed_apps(line) {
            Ok(record) => record,
            Err(e) => {
                stats.errors += 1;
                debug!(error = %e, line, "Failed to parse line");
                continue;
            },
        };

        let Some(queue) = queues.get(&record.device_type) else {
            stats.errors += 1;
            warn!(device_type = %record.device_type, "Unknown device type");
            continue;
        };

        let (key, payload) = serialize_installed_apps(record);
        if queue.blocking_send(UploadItem { key, payload }).is_err() {
            // worker is gone, the item can never be written
            stats.errors += 1;
        }
    }

    stats
}

async fn collect_outcomes(
    workers: &mut JoinSet<UploadOutcome>,
    expected: usize,
) -> UploadOutcome {
    let mut total = UploadOutcome::default();
    let mut reports = 0;

    while let Some(result) = workers.join_next().await {
        match result {
            Ok(outcome) => {
                total += outcome;
                reports += 1;
            },
            Err(e) => error!(error = %e, "Upload worker died before reporting"),
        }
    }

    if reports != expected {
        warn!(expected, reports, "Missing upload worker reports");
    }

    total
}

fn log_verdict(report: &FileReport, lines: u64) {
    let path = report.path.display();
    let error_rate = report.error_rate();

    match report.verdict() {
        Verdict::Accepted => info!(
            path = %path,
            lines,
            processed = report.processed,
            errors = report.errors,
            error_rate,
            "Acceptable error rate, file loaded"
        ),
        Verdict::Rejected => error!(
            path = %path,
            lines,
            processed = report.processed,
            errors = report.errors,
            error_rate,
            threshold = NORMAL_ERROR_RATE,
            "High error rate, file load failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_keeps_tabs() {
        assert_eq!(strip_line(b"  idfa\tx\t1\t2\t\r\n"), Some("idfa\tx\t1\t2\t"));
        assert_eq!(strip_line(b"\n"), Some(""));
        assert_eq!(strip_line(&[0xFF, 0xFE, b'\n']), None);
    }
}
