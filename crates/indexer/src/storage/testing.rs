//! Storage wrapper with injectable failures.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use super::{Document, MemoryStorage, Storage};
use crate::error::{IndexerError, Result};

/// Memory storage whose scalar reads fail for selected keys.
#[derive(Default)]
pub struct FaultyStorage {
    inner: MemoryStorage,
    failing_reads: Mutex<HashSet<String>>,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get_value` of `key` fail with `StorageUnavailable`.
    pub fn fail_reads_of(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    fn check_read(&self, key: &str) -> Result<()> {
        if self.failing_reads.lock().unwrap().contains(key) {
            return Err(IndexerError::storage(format!("read of {} refused", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FaultyStorage {
    async fn get_object(&self, key: &str) -> Result<Document> {
        self.inner.get_object(key).await
    }

    async fn add_object(&self, key: &str, value: &Document) -> Result<()> {
        self.inner.add_object(key, value).await
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.check_read(key)?;
        self.inner.get_value(key).await
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_value(key, value).await
    }

    async fn del_value(&self, key: &str) -> Result<()> {
        self.inner.del_value(key).await
    }

    async fn get_multiple_values(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        for key in keys {
            self.check_read(key)?;
        }
        self.inner.get_multiple_values(keys).await
    }

    async fn incr_value(&self, key: &str) -> Result<u64> {
        self.inner.incr_value(key).await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        self.inner.sadd(key, member).await
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        self.inner.srem(key, member).await
    }

    async fn get_array(&self, key: &str) -> Result<Vec<String>> {
        self.inner.get_array(key).await
    }

    async fn index_tx(
        &self,
        tx_type: &str,
        address: &str,
        tx_id: &str,
        timestamp: u64,
    ) -> Result<()> {
        self.inner.index_tx(tx_type, address, tx_id, timestamp).await
    }

    async fn get_tx(
        &self,
        tx_type: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        self.inner.get_tx(tx_type, address, limit, offset).await
    }

    async fn count_tx(&self, tx_type: &str, address: &str) -> Result<u64> {
        self.inner.count_tx(tx_type, address).await
    }
}
