//! Loader configuration

use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default memcached endpoint for each device type.
pub const DEFAULT_DESTINATIONS: [(&str, &str); 4] = [
    ("idfa", "127.0.0.1:33013"),
    ("gaid", "127.0.0.1:33014"),
    ("adid", "127.0.0.1:33015"),
    ("dvid", "127.0.0.1:33016"),
];

/// Default connect/IO timeout for a store connection in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 3;

/// Default number of extra attempts after a failed store write.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default number of files processed at the same time.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 6;

/// Default capacity of every per-destination upload queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default input file pattern.
pub const DEFAULT_PATTERN: &str = "/data/appsinstalled/*.tsv.gz";

/// Loader settings, read-only once the pipeline starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Device type -> memcached address
    pub destinations: BTreeMap<String, String>,
    pub connection_timeout_secs: u64,
    pub retry_limit: u32,
    pub concurrency_limit: usize,
    pub queue_capacity: usize,
    /// Log writes instead of sending them
    pub dry_run: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            destinations: DEFAULT_DESTINATIONS
                .iter()
                .map(|(class, address)| (class.to_string(), address.to_string()))
                .collect(),
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            retry_limit: DEFAULT_RETRY_LIMIT,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dry_run: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl LoaderConfig {
    /// Load configuration from environment (and `.env`) over the defaults
    ///
    /// - `MEMC_IDFA`, `MEMC_GAID`, `MEMC_ADID`, `MEMC_DVID`: store addresses
    /// - `MEMC_STORAGE_TIMEOUT`: connection timeout in seconds
    /// - `MEMC_STORAGE_MAX_RETRIES`: retries after a failed write
    /// - `MEMC_CONCURRENCY`: files processed at once
    /// - `MEMC_QUEUE_CAPACITY`: per-destination queue size
    /// - `MEMC_DRY_RUN`: true/false
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        for (class, address) in config.destinations.iter_mut() {
            if let Ok(value) = std::env::var(format!("MEMC_{}", class.to_uppercase())) {
                *address = value;
            }
        }

        if let Some(secs) = env_parse("MEMC_STORAGE_TIMEOUT") {
            config.connection_timeout_secs = secs;
        }
        if let Some(retries) = env_parse("MEMC_STORAGE_MAX_RETRIES") {
            config.retry_limit = retries;
        }
        if let Some(limit) = env_parse("MEMC_CONCURRENCY") {
            config.concurrency_limit = limit;
        }
        if let Some(capacity) = env_parse("MEMC_QUEUE_CAPACITY") {
            config.queue_capacity = capacity;
        }
        if let Some(dry_run) = env_parse("MEMC_DRY_RUN") {
            config.dry_run = dry_run;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.destinations.is_empty() {
            anyhow::bail!("At least one destination must be configured");
        }

        for (class, address) in &self.destinations {
            if class.is_empty() || class.contains(':') {
                anyhow::bail!("Invalid destination class {:?}", class);
            }
            if address.trim().is_empty() {
                anyhow::bail!("Destination {} has an empty address", class);
            }
        }

        if self.connection_timeout_secs == 0 {
            anyhow::bail!("Storage timeout must be greater than 0");
        }

        if self.concurrency_limit == 0 {
            anyhow::bail!("Concurrency limit must be greater than 0");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("Queue capacity must be greater than 0");
        }

        Ok(())
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}
