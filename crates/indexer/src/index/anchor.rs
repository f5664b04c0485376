//! Anchor index: hex hash to the transactions that anchored it.

use std::sync::Arc;
use tracing::{debug, warn};

use lto_index_core::encoding::{
    anchor_hash_from_base58, anchor_hash_from_base64, hex_decode, hex_encode,
};
use lto_index_core::{Transaction, ANCHOR_DATA_KEY, TX_ANCHOR, TX_DATA};

use crate::error::{IndexerError, Result};
use crate::storage::{keys, Storage};

/// Records anchors carried by data and anchor transactions.
#[derive(Clone)]
pub struct AnchorIndex {
    storage: Arc<dyn Storage>,
}

impl AnchorIndex {
    /// Create a new anchor index.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Index every anchor of `tx`. Returns the number of anchors recorded.
    ///
    /// Undecodable anchors are logged and skipped.
    pub async fn index(&self, tx: &Transaction) -> Result<usize> {
        match tx.tx_type {
            TX_DATA => self.index_data_entries(tx).await,
            TX_ANCHOR => self.index_anchors(tx).await,
            _ => Ok(0),
        }
    }

    async fn index_data_entries(&self, tx: &Transaction) -> Result<usize> {
        let mut recorded = 0;

        for entry in tx.data.iter().filter(|e| e.key == ANCHOR_DATA_KEY) {
            let hash = match entry.value_str() {
                Some(value) => anchor_hash_from_base64(value)
                    .map_err(|e| IndexerError::malformed(&tx.id, e)),
                None => Err(IndexerError::malformed(&tx.id, "anchor value is not a string")),
            };

            match hash {
                Ok(hash) => {
                    self.save_anchor(&hash, &tx.id).await?;
                    recorded += 1;
                }
                Err(e) => warn!("Skipping anchor data entry: {}", e),
            }
        }

        Ok(recorded)
    }

    async fn index_anchors(&self, tx: &Transaction) -> Result<usize> {
        let mut recorded = 0;

        // Each write completes before the next anchor is decoded
        for anchor in &tx.anchors {
            match anchor_hash_from_base58(anchor) {
                Ok(hash) => {
                    self.save_anchor(&hash, &tx.id).await?;
                    recorded += 1;
                }
                Err(e) => warn!(
                    "Skipping anchor: {}",
                    IndexerError::malformed(&tx.id, e)
                ),
            }
        }

        Ok(recorded)
    }

    /// Associate a hex hash with a transaction id.
    pub async fn save_anchor(&self, hash: &str, tx_id: &str) -> Result<()> {
        debug!("Anchor {} in tx {}", hash, tx_id);
        self.storage.sadd(&keys::anchor(hash), tx_id).await
    }

    /// Transactions that anchored `hash` (hex, case-insensitive).
    pub async fn get_anchor(&self, hash: &str) -> Result<Vec<String>> {
        let hash = hex_encode(&hex_decode(hash)?);
        self.storage.get_array(&keys::anchor(&hash)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn setup() -> (AnchorIndex, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        (AnchorIndex::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_legacy_data_anchor() {
        let (index, _storage) = setup();

        let tx: Transaction = serde_json::from_value(json!({
            "id": "tx12",
            "type": 12,
            "sender": "3Ns",
            "data": [
                {"key": "\u{2693}anchor", "type": "binary", "value": "base64:aGVsbG8="},
                {"key": "note", "type": "string", "value": "base64:aGVsbG8="}
            ]
        }))
        .unwrap();

        assert_eq!(index.index(&tx).await.unwrap(), 1);
        assert_eq!(
            index.get_anchor("68656c6c6f").await.unwrap(),
            vec!["tx12".to_string()]
        );
    }

    #[tokio::test]
    async fn test_native_anchors_all_recorded() {
        let (index, _storage) = setup();

        let tx: Transaction = serde_json::from_value(json!({
            "id": "tx15",
            "type": 15,
            "sender": "3Ns",
            "anchors": ["Cn8eVZg", "2g", "Cn8eVZg"]
        }))
        .unwrap();

        assert_eq!(index.index(&tx).await.unwrap(), 3);
        assert_eq!(index.get_anchor("68656c6c6f").await.unwrap(), vec!["tx15"]);
        // base58 "2g" = 0x61
        assert_eq!(index.get_anchor("61").await.unwrap(), vec!["tx15"]);
    }

    #[tokio::test]
    async fn test_malformed_anchor_is_skipped() {
        let (index, _storage) = setup();

        let tx: Transaction = serde_json::from_value(json!({
            "id": "tx15",
            "type": 15,
            "sender": "3Ns",
            "anchors": ["0OIl", "Cn8eVZg"]
        }))
        .unwrap();

        assert_eq!(index.index(&tx).await.unwrap(), 1);
        assert_eq!(index.get_anchor("68656c6c6f").await.unwrap(), vec!["tx15"]);
    }

    #[tokio::test]
    async fn test_non_string_data_value_is_skipped() {
        let (index, _storage) = setup();

        let tx: Transaction = serde_json::from_value(json!({
            "id": "tx12",
            "type": 12,
            "sender": "3Ns",
            "data": [{"key": "\u{2693}anchor", "type": "integer", "value": 42}]
        }))
        .unwrap();

        assert_eq!(index.index(&tx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_base64_entry_is_skipped() {
        let (index, storage) = setup();

        let tx: Transaction = serde_json::from_value(json!({
            "id": "tx12",
            "type": 12,
            "sender": "3Ns",
            "data": [
                {"key": "\u{2693}anchor", "type": "binary", "value": "base64:%%not base64%%"},
                {"key": "\u{2693}anchor", "type": "binary", "value": "base64:aGVsbG8="}
            ]
        }))
        .unwrap();

        assert_eq!(index.index(&tx).await.unwrap(), 1);
        assert_eq!(index.get_anchor("68656c6c6f").await.unwrap(), vec!["tx12"]);
        assert_eq!(
            storage.get_array(&keys::anchor("68656c6c6f")).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_reanchoring_appends_to_set() {
        let (index, _storage) = setup();

        index.save_anchor("abcd", "tx1").await.unwrap();
        index.save_anchor("abcd", "tx2").await.unwrap();
        index.save_anchor("abcd", "tx1").await.unwrap();

        let mut ids = index.get_anchor("0xABCD").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["tx1", "tx2"]);
    }

    #[tokio::test]
    async fn test_lookup_rejects_non_hex() {
        let (index, _storage) = setup();

        let result = index.get_anchor("not-hex").await;
        assert!(matches!(result, Err(IndexerError::Core(_))));
    }
}
