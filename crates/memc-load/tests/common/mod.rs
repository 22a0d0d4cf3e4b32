//! Shared fixtures for loader integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use memc_load::processor::FileProcessor;
use memc_load::store::{Destinations, InMemoryStore, KeyValueStore};

/// One complete gzip member holding `lines`
pub fn gzip_member(lines: &[String]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap()
}

/// Write `lines` as a gzip file and return its path
pub fn write_gz(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, gzip_member(lines)).unwrap();
    path
}

/// A well-formed line for `device_type`
pub fn line(device_type: &str, device_id: &str) -> String {
    format!("{device_type}\t{device_id}\t55.55\t42.42\t1423,43,567")
}

/// Destinations made of in-memory stores, one per class
pub fn memory_destinations(
    stores: Vec<(&str, Arc<InMemoryStore>)>,
) -> Arc<Destinations> {
    Arc::new(
        stores
            .into_iter()
            .map(|(class, store)| (class.to_string(), store as Arc<dyn KeyValueStore>))
            .collect(),
    )
}

pub fn processor(destinations: Arc<Destinations>, retry_limit: u32) -> FileProcessor {
    FileProcessor::new(destinations, retry_limit, 16)
}
