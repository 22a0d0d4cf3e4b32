//! memc-load - installed-apps log loader

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use memc_common::logging::{init_logging, LogConfig, LogOutput};
use memc_load::config::{LoaderConfig, DEFAULT_PATTERN};
use memc_load::discovery::discover;
use memc_load::dispatcher::Dispatcher;
use memc_load::processor::FileProcessor;
use memc_load::serializer::verify_round_trip;
use memc_load::store::Destinations;
use tracing::{info, warn, Level};

/// Lines checked by `--test`
const SELF_TEST_LINES: [&str; 2] = [
    "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23",
    "gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424",
];

#[derive(Parser, Debug)]
#[command(name = "memc-load")]
#[command(author, version, about = "Load installed-apps logs into memcached")]
struct Cli {
    /// Check the UserApps encoding on built-in samples and exit
    #[arg(short, long)]
    test: bool,

    /// Write logs to this file instead of stdout
    #[arg(short, long, env = "MEMC_LOG_FILE")]
    log: Option<String>,

    /// Log writes instead of sending them to memcached
    #[arg(long)]
    dry: bool,

    /// Input files, wildcards allowed in the file name
    #[arg(long, env = "MEMC_PATTERN", default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// memcached address for idfa devices
    #[arg(long)]
    idfa: Option<String>,

    /// memcached address for gaid devices
    #[arg(long)]
    gaid: Option<String>,

    /// memcached address for adid devices
    #[arg(long)]
    adid: Option<String>,

    /// memcached address for dvid devices
    #[arg(long)]
    dvid: Option<String>,

    /// Timeout for storage connection in seconds
    #[arg(long)]
    storage_timeout: Option<u64>,

    /// Maximum retries number in case of failed saving
    #[arg(long)]
    storage_max_retries: Option<u32>,

    /// Number of files loaded at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Capacity of every per-device-type upload queue
    #[arg(long)]
    queue_capacity: Option<usize>,
}

impl Cli {
    /// Apply command line overrides on top of the environment configuration
    fn apply(&self, mut config: LoaderConfig) -> Result<LoaderConfig> {
        let addresses = [
            ("idfa", &self.idfa),
            ("gaid", &self.gaid),
            ("adid", &self.adid),
            ("dvid", &self.dvid),
        ];
        for (class, address) in addresses {
            if let Some(address) = address {
                config.destinations.insert(class.to_string(), address.clone());
            }
        }

        if let Some(secs) = self.storage_timeout {
            config.connection_timeout_secs = secs;
        }
        if let Some(retries) = self.storage_max_retries {
            config.retry_limit = retries;
        }
        if let Some(limit) = self.concurrency {
            config.concurrency_limit = limit;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        config.dry_run |= self.dry;

        config.validate()?;
        Ok(config)
    }

    fn log_config(&self) -> Result<LogConfig> {
        let level = if self.dry { Level::DEBUG } else { Level::INFO };
        let mut builder = LogConfig::builder().level(level).log_file_prefix("memc-load");

        if let Some(log) = &self.log {
            let path = Path::new(log);
            let prefix = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid log file: {log}"))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));

            builder = builder
                .output(LogOutput::File)
                .log_dir(dir)
                .log_file_prefix(prefix);
        }

        // Environment variables take precedence
        builder.build().merge_env()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.log_config()?)?;

    if cli.test {
        for line in SELF_TEST_LINES {
            verify_round_trip(line)?;
        }
        info!("UserApps round trip OK");
        return Ok(());
    }

    let config = cli.apply(LoaderConfig::from_env()?)?;
    info!(?config, pattern = %cli.pattern, "memc-load started");

    let files = discover(&cli.pattern)?;
    for file in &files {
        info!(path = %file.display(), "File for uploading");
    }

    let destinations = Arc::new(Destinations::from_config(&config));
    let processor = FileProcessor::from_config(&config, destinations);
    let dispatcher = Dispatcher::new(processor, config.concurrency_limit, config.queue_capacity);

    let summary = dispatcher.run(files).await;

    for file in &summary.abandoned {
        warn!(path = %file.path.display(), reason = %file.reason, "File was not loaded");
    }

    info!(
        files = summary.marked.len() + summary.marking_failures,
        accepted = summary.accepted(),
        abandoned = summary.abandoned.len(),
        "memc-load finished"
    );
    Ok(())
}
