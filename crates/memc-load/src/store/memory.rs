//! In-process store with scriptable failures

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreError};
use crate::models::{RoutingKey, SerializedPayload};

/// HashMap-backed store
///
/// Keys registered with [`InMemoryStore::with_failing_key`] fail the given
/// number of times before a write succeeds; `u32::MAX` never succeeds.
#[derive(Default)]
pub struct InMemoryStore {
    address: String,
    entries: Mutex<HashMap<String, Vec<u8>>>,
    failures_left: Mutex<HashMap<String, u32>>,
    attempts: AtomicU64,
}

impl InMemoryStore {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_failing_key(mut self, key: impl Into<String>, failures: u32) -> Self {
        self.failures_left.get_mut().insert(key.into(), failures);
        self
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Every `set` call so far, failed ones included
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn address(&self) -> &str {
        &self.address
    }

    async fn set(&self, key: &RoutingKey, value: &SerializedPayload) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if let Some(left) = self.failures_left.lock().await.get_mut(key.as_str()) {
            if *left > 0 {
                if *left != u32::MAX {
                    *left -= 1;
                }
                return Err(StoreError::Rejected(format!("scripted failure for {key}")));
            }
        }

        self.entries
            .lock()
            .await
            .insert(key.as_str().to_string(), value.as_bytes().to_vec());
        Ok(())
    }
}
