//! memc-load Library
//!
//! Loads gzip-compressed installed-apps logs into memcached.
//!
//! # Pipeline
//!
//! - [`dispatcher::Dispatcher`]: bounded pool of file processors, marks files
//!   as processed when the pool is done
//! - [`processor::FileProcessor`]: scans one file, fans records out per
//!   device type, computes the error-rate verdict
//! - [`parser`] and [`serializer`]: line to record to `UserApps` bytes
//! - [`uploader::UploadWorker`]: one per device type per file, bounded retry
//! - [`store`]: memcached, dry-run and in-memory stores
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use memc_load::config::LoaderConfig;
//! use memc_load::dispatcher::Dispatcher;
//! use memc_load::processor::FileProcessor;
//! use memc_load::store::Destinations;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::from_env()?;
//!     let files = memc_load::discovery::discover("/data/appsinstalled/*.tsv.gz")?;
//!
//!     let destinations = Arc::new(Destinations::from_config(&config));
//!     let processor = FileProcessor::from_config(&config, destinations);
//!     let summary = Dispatcher::new(processor, config.concurrency_limit, config.queue_capacity)
//!         .run(files)
//!         .await;
//!
//!     tracing::info!(loaded = summary.reports.len(), "Done");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod models;
pub mod parser;
pub mod processor;
pub mod serializer;
pub mod store;
pub mod uploader;
