//! Data types flowing through the loader pipeline

use std::fmt;
use std::ops::AddAssign;
use std::path::PathBuf;

/// Error rate below which a file counts as successfully loaded
pub const NORMAL_ERROR_RATE: f64 = 0.01;

/// One parsed line of an installed-apps log
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledAppsRecord {
    /// Destination class, e.g. "idfa" or "gaid"
    pub device_type: String,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Application ids in line order
    pub app_ids: Vec<u32>,
}

/// Store key for one device: `device_type:device_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn new(device_type: &str, device_id: &str) -> Self {
        Self(format!("{device_type}:{device_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded `UserApps` value, never modified after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedPayload(Vec<u8>);

impl SerializedPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SerializedPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Unit of work handed to an upload worker
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub key: RoutingKey,
    pub payload: SerializedPayload,
}

/// Aggregate result of one upload worker's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub processed: u64,
    pub errors: u64,
}

impl UploadOutcome {
    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self) {
        self.errors += 1;
    }
}

impl AddAssign for UploadOutcome {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.errors += other.errors;
    }
}

/// Informational judgement on a loaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// `errors / processed`, or 1.0 when nothing was processed
pub fn error_rate(processed: u64, errors: u64) -> f64 {
    if processed == 0 {
        return 1.0;
    }
    errors as f64 / processed as f64
}

/// Totals for one fully scanned file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Successful store writes
    pub processed: u64,
    /// Parse failures, unknown device types and failed writes
    pub errors: u64,
}

impl FileReport {
    pub fn error_rate(&self) -> f64 {
        error_rate(self.processed, self.errors)
    }

    pub fn verdict(&self) -> Verdict {
        if self.error_rate() < NORMAL_ERROR_RATE {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(processed: u64, errors: u64) -> FileReport {
        FileReport {
            path: PathBuf::from("a.tsv.gz"),
            processed,
            errors,
        }
    }

    #[test]
    fn test_error_rate_with_nothing_processed() {
        assert_eq!(error_rate(0, 0), 1.0);
        assert_eq!(error_rate(0, 17), 1.0);
    }

    #[test]
    fn test_verdict_threshold() {
        assert_eq!(report(1000, 9).verdict(), Verdict::Accepted);
        assert_eq!(report(100, 1).verdict(), Verdict::Rejected);
        assert_eq!(report(98, 2).verdict(), Verdict::Rejected);
        assert_eq!(report(0, 0).verdict(), Verdict::Rejected);
    }

    #[test]
    fn test_outcome_accumulates() {
        let mut total = UploadOutcome::default();
        let mut worker = UploadOutcome::default();
        worker.record_success();
        worker.record_success();
        worker.record_failure();

        total += worker;
        total += UploadOutcome::default();

        assert_eq!(
            total,
            UploadOutcome {
                processed: 2,
                errors: 1
            }
        );
    }

    #[test]
    fn test_routing_key_format() {
        assert_eq!(RoutingKey::new("idfa", "abc123").as_str(), "idfa:abc123");
    }
}
