//! Per-address transaction history.

use std::sync::Arc;

use lto_index_core::{indexes_recipients, Transaction};

use crate::error::Result;
use crate::storage::Storage;

/// Default page size for history reads.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Ranked transaction history per (type name, address).
#[derive(Clone)]
pub struct TransactionIndex {
    storage: Arc<dyn Storage>,
}

impl TransactionIndex {
    /// Create a new transaction index.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Record `tx` under its sender and, for recipient-bearing types, under
    /// every recipient. Returns the addresses it was recorded under.
    pub async fn index(&self, tx: &Transaction) -> Result<Vec<String>> {
        let type_name = tx.type_name();
        let mut addresses: Vec<String> =
            tx.sender_address().into_iter().map(str::to_string).collect();

        if indexes_recipients(tx.tx_type) {
            addresses.extend(tx.recipients().map(str::to_string));
        }

        for address in &addresses {
            self.storage
                .index_tx(type_name, address, &tx.id, tx.timestamp)
                .await?;
        }

        Ok(addresses)
    }

    /// A page of transaction ids, oldest first.
    pub async fn get_transactions(
        &self,
        type_name: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        self.storage.get_tx(type_name, address, limit, offset).await
    }

    /// Number of transactions of `type_name` recorded for `address`.
    pub async fn count_transactions(&self, type_name: &str, address: &str) -> Result<u64> {
        self.storage.count_tx(type_name, address).await
    }
}
