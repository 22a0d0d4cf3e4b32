//! Key-value store clients
//!
//! Every destination class (device type) writes to its own store. The loader
//! only ever needs one operation: put one key/value pair, overwriting whatever
//! was there.
//!
//! - [`MemcacheStore`]: memcached text protocol over TCP
//! - [`DryRunStore`]: logs writes instead of sending them (`--dry`)
//! - [`InMemoryStore`]: scriptable map used by tests and local runs

pub mod dry_run;
pub mod memcache;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LoaderConfig;
use crate::models::{RoutingKey, SerializedPayload};

pub use dry_run::DryRunStore;
pub use memcache::MemcacheStore;
pub use memory::InMemoryStore;

/// A failed single-item write
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{address} did not answer within {secs}s")]
    Timeout { address: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Keyed overwrite-on-write store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Endpoint this store writes to, for logging
    fn address(&self) -> &str;

    /// Write one pair; repeating the call with the same arguments is harmless
    async fn set(&self, key: &RoutingKey, value: &SerializedPayload) -> Result<(), StoreError>;
}

/// Immutable destination class to store mapping, built once at startup
#[derive(Clone, Default)]
pub struct Destinations {
    stores: BTreeMap<String, Arc<dyn KeyValueStore>>,
}

impl Destinations {
    /// One memcached client per configured class, or dry-run stores when the
    /// config asks for a dry run
    pub fn from_config(config: &LoaderConfig) -> Self {
        let timeout = config.connection_timeout();

        config
            .destinations
            .iter()
            .map(|(class, address)| {
                let store: Arc<dyn KeyValueStore> = if config.dry_run {
                    Arc::new(DryRunStore::new(address.clone()))
                } else {
                    Arc::new(MemcacheStore::new(address.clone(), timeout))
                };
                (class.clone(), store)
            })
            .collect()
    }

    pub fn get(&self, class: &str) -> Option<&Arc<dyn KeyValueStore>> {
        self.stores.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.stores.contains_key(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn KeyValueStore>)> {
        self.stores.iter().map(|(class, store)| (class.as_str(), store))
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl FromIterator<(String, Arc<dyn KeyValueStore>)> for Destinations {
    fn from_iter<I: IntoIterator<Item = (String, Arc<dyn KeyValueStore>)>>(iter: I) -> Self {
        Self {
            stores: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for Destinations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.stores.iter().map(|(class, store)| (class, store.address())))
            .finish()
    }
}
