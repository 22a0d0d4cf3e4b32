//! Store that only logs what would have been written

use async_trait::async_trait;
use tracing::debug;

use super::{KeyValueStore, StoreError};
use crate::models::{RoutingKey, SerializedPayload};

pub struct DryRunStore {
    address: String,
}

impl DryRunStore {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for DryRunStore {
    fn address(&self) -> &str {
        &self.address
    }

    async fn set(&self, key: &RoutingKey, value: &SerializedPayload) -> Result<(), StoreError> {
        debug!(address = %self.address, %key, payload = ?value.as_bytes(), "dry run write");
        Ok(())
    }
}
