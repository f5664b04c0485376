//! Storage layer for the indexer.
//!
//! All derived indexes go through the [`Storage`] trait, which offers:
//! - An object store for read-merge-write JSON documents
//! - A scalar key-value store with atomic counters
//! - A set store
//! - Ranked, paginated transaction sequences per (type, address)
//!
//! Two backends implement it: [`MemoryStorage`] (ordered in-memory maps) and
//! [`SqliteStorage`] (persistent, SQLite through `sqlx`). The backend is chosen
//! once at startup by [`open_storage`].
//!
//! Absent keys are never an error: reads return an empty document, `None`, an
//! empty list or zero. Backend failures surface as
//! [`IndexerError::StorageUnavailable`](crate::error::IndexerError).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::error::Result;

pub mod keys;
pub mod memory;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// A structured document in the object store.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Capability interface shared by all storage backends.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a document. Absent keys yield an empty document.
    async fn get_object(&self, key: &str) -> Result<Document>;

    /// Replace a document.
    async fn add_object(&self, key: &str, value: &Document) -> Result<()>;

    /// Read a scalar value.
    async fn get_value(&self, key: &str) -> Result<Option<String>>;

    /// Write a scalar value.
    async fn set_value(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a scalar value. Deleting an absent key is a no-op.
    async fn del_value(&self, key: &str) -> Result<()>;

    /// Read several scalar values, aligned with `keys`.
    async fn get_multiple_values(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Atomically increment a counter, creating it at zero first.
    ///
    /// Returns the new value.
    async fn incr_value(&self, key: &str) -> Result<u64>;

    /// Add a member to a set.
    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    /// Remove a member from a set.
    async fn srem(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set. Order carries no meaning.
    async fn get_array(&self, key: &str) -> Result<Vec<String>>;

    /// Append a transaction to the ranked sequence of (type, address).
    ///
    /// Ranks are strictly increasing across the whole store. Appending an id
    /// already present in the sequence keeps its original rank.
    async fn index_tx(&self, tx_type: &str, address: &str, tx_id: &str, timestamp: u64)
        -> Result<()>;

    /// A page of transaction ids in rank order.
    async fn get_tx(
        &self,
        tx_type: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    /// Number of entries in the ranked sequence of (type, address).
    async fn count_tx(&self, tx_type: &str, address: &str) -> Result<u64>;

    /// Release backend resources.
    async fn close(&self) {}
}

/// Open the backend selected by configuration.
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Using in-memory storage (index is lost on restart)");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageType::Sqlite => {
            let storage = SqliteStorage::new(
                &config.sqlite.url,
                Some(config.sqlite.max_connections),
                Some(config.sqlite.min_connections),
            )
            .await?;
            storage.run_migrations().await?;
            Ok(Arc::new(storage))
        }
    }
}

/// Behaviour every backend must share.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::error::IndexerError;
    use serde_json::json;

    pub async fn check_absent_keys(storage: &dyn Storage) {
        assert!(storage.get_object("lto:none").await.unwrap().is_empty());
        assert_eq!(storage.get_value("lto:none").await.unwrap(), None);
        assert!(storage.get_array("lto:none").await.unwrap().is_empty());
        assert_eq!(storage.count_tx("transfer", "3Nnone").await.unwrap(), 0);
        assert!(storage
            .get_tx("transfer", "3Nnone", 10, 0)
            .await
            .unwrap()
            .is_empty());
        storage.del_value("lto:none").await.unwrap();
    }

    pub async fn check_values(storage: &dyn Storage) {
        storage.set_value("lto:a", "1").await.unwrap();
        storage.set_value("lto:b", "2").await.unwrap();
        storage.set_value("lto:a", "3").await.unwrap();

        let values = storage
            .get_multiple_values(&[
                "lto:a".to_string(),
                "lto:missing".to_string(),
                "lto:b".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![Some("3".to_string()), None, Some("2".to_string())]
        );

        storage.del_value("lto:a").await.unwrap();
        assert_eq!(storage.get_value("lto:a").await.unwrap(), None);
    }

    pub async fn check_counters(storage: &dyn Storage) {
        assert_eq!(storage.incr_value("lto:counter").await.unwrap(), 1);
        assert_eq!(storage.incr_value("lto:counter").await.unwrap(), 2);
        assert_eq!(
            storage.get_value("lto:counter").await.unwrap(),
            Some("2".to_string())
        );

        // A non-integer value is rejected and kept as is
        storage.set_value("lto:not-a-counter", "abc").await.unwrap();
        assert!(matches!(
            storage.incr_value("lto:not-a-counter").await,
            Err(IndexerError::StorageUnavailable(_))
        ));
        assert_eq!(
            storage.get_value("lto:not-a-counter").await.unwrap(),
            Some("abc".to_string())
        );
    }

    pub async fn check_objects(storage: &dyn Storage) {
        let mut doc = Document::new();
        doc.insert("validator".into(), json!({"sender": "3Nroot", "type": 100}));
        storage.add_object("lto:roles:3Nx", &doc).await.unwrap();

        let read = storage.get_object("lto:roles:3Nx").await.unwrap();
        assert_eq!(read, doc);
    }

    pub async fn check_sets(storage: &dyn Storage) {
        storage.sadd("lto:set", "b").await.unwrap();
        storage.sadd("lto:set", "a").await.unwrap();
        storage.sadd("lto:set", "a").await.unwrap();

        let mut members = storage.get_array("lto:set").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);

        storage.srem("lto:set", "a").await.unwrap();
        storage.srem("lto:set", "zz").await.unwrap();
        assert_eq!(storage.get_array("lto:set").await.unwrap(), vec!["b".to_string()]);
    }

    pub async fn check_ranked_index(storage: &dyn Storage) {
        for (i, id) in ["t1", "t2", "t3", "t4"].iter().enumerate() {
            storage
                .index_tx("transfer", "3Na", id, 1000 + i as u64)
                .await
                .unwrap();
            // Interleave another sequence to make sure ranks stay per-sequence ordered
            storage
                .index_tx("transfer", "3Nb", id, 1000 + i as u64)
                .await
                .unwrap();
        }

        // Re-indexing keeps the original rank and does not duplicate
        storage.index_tx("transfer", "3Na", "t2", 9999).await.unwrap();

        assert_eq!(storage.count_tx("transfer", "3Na").await.unwrap(), 4);
        assert_eq!(
            storage.get_tx("transfer", "3Na", 10, 0).await.unwrap(),
            vec!["t1", "t2", "t3", "t4"]
        );
        assert_eq!(
            storage.get_tx("transfer", "3Na", 2, 1).await.unwrap(),
            vec!["t2", "t3"]
        );
        assert!(storage
            .get_tx("transfer", "3Na", 10, 4)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(storage.count_tx("anchor", "3Na").await.unwrap(), 0);
    }

    pub async fn check_all(storage: &dyn Storage) {
        check_absent_keys(storage).await;
        check_values(storage).await;
        check_counters(storage).await;
        check_objects(storage).await;
        check_sets(storage).await;
        check_ranked_index(storage).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqliteConfig;

    #[tokio::test]
    async fn test_open_memory_storage() {
        let config = StorageConfig {
            storage_type: StorageType::Memory,
            sqlite: SqliteConfig::default(),
        };

        let storage = open_storage(&config).await.unwrap();
        contract::check_all(storage.as_ref()).await;
    }

    #[tokio::test]
    async fn test_open_sqlite_storage() {
        let temp_db = tempfile::NamedTempFile::new().unwrap();
        let config = StorageConfig {
            storage_type: StorageType::Sqlite,
            sqlite: SqliteConfig {
                url: format!("sqlite://{}", temp_db.path().display()),
                ..SqliteConfig::default()
            },
        };

        let storage = open_storage(&config).await.unwrap();
        contract::check_all(storage.as_ref()).await;
        storage.close().await;
    }
}
