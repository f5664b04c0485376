//! In-memory storage backend.
//!
//! Ordered maps behind a single `RwLock`. Nothing is persisted, which makes it
//! the backend of choice for tests and throwaway replays.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio::sync::RwLock;

use super::{Document, Storage};
use crate::error::{IndexerError, Result};

#[derive(Debug)]
struct RankedEntry {
    rank: u64,
    tx_id: String,
}

#[derive(Debug, Default)]
struct RankedSequence {
    entries: Vec<RankedEntry>,
    ids: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, Document>,
    values: BTreeMap<String, String>,
    sets: BTreeMap<String, BTreeSet<String>>,
    ranked: BTreeMap<(String, String), RankedSequence>,
    next_rank: u64,
}

/// Storage backed by in-process ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_object(&self, key: &str) -> Result<Document> {
        let inner = self.inner.read().await;
        Ok(inner.objects.get(key).cloned().unwrap_or_default())
    }

    async fn add_object(&self, key: &str, value: &Document) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.objects.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner.values.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del_value(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.values.remove(key);
        Ok(())
    }

    async fn get_multiple_values(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let inner = self.inner.read().await;
        Ok(keys.iter().map(|k| inner.values.get(k).cloned()).collect())
    }

    async fn incr_value(&self, key: &str) -> Result<u64> {
        let mut inner = self.inner.write().await;

        let current = match inner.values.get(key) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                IndexerError::storage(format!("value at {} is not an integer", key))
            })?,
            None => 0,
        };

        let next = current + 1;
        inner.values.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(set) = inner.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                inner.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn get_array(&self, key: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn index_tx(
        &self,
        tx_type: &str,
        address: &str,
        tx_id: &str,
        _timestamp: u64,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let rank = inner.next_rank;

        let sequence = inner
            .ranked
            .entry((tx_type.to_string(), address.to_string()))
            .or_default();

        if !sequence.ids.insert(tx_id.to_string()) {
            return Ok(());
        }

        sequence.entries.push(RankedEntry {
            rank,
            tx_id: tx_id.to_string(),
        });
        inner.next_rank = rank + 1;

        Ok(())
    }

    async fn get_tx(
        &self,
        tx_type: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let Some(sequence) = inner
            .ranked
            .get(&(tx_type.to_string(), address.to_string()))
        else {
            return Ok(Vec::new());
        };

        // Entries are pushed with increasing ranks, so vector order is rank order
        debug_assert!(sequence.entries.windows(2).all(|w| w[0].rank < w[1].rank));

        Ok(sequence
            .entries
            .iter()
            .skip(offset)
            .take(limit)
            .map(|e| e.tx_id.clone())
            .collect())
    }

    async fn count_tx(&self, tx_type: &str, address: &str) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .ranked
            .get(&(tx_type.to_string(), address.to_string()))
            .map(|s| s.entries.len() as u64)
            .unwrap_or(0))
    }
}
