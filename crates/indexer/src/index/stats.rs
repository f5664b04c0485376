//! Daily transaction counters.

use serde::Serialize;
use std::sync::Arc;

use lto_index_core::Transaction;

use crate::error::{IndexerError, Result};
use crate::storage::{keys, Storage};

/// Largest day range served by a single statistics read.
pub const MAX_STATS_DAYS: u64 = 366;

/// Transaction count for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// Day number (days since the unix epoch).
    pub day: u64,
    /// Transactions seen that day.
    pub count: u64,
}

/// Per (type name, day) counters.
#[derive(Clone)]
pub struct StatsIndex {
    storage: Arc<dyn Storage>,
}

impl StatsIndex {
    /// Create a new stats index.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Count `tx` in its type/day bucket. Returns the new count.
    ///
    /// Not idempotent: rescanning a block counts its transactions again.
    pub async fn increment(&self, tx: &Transaction) -> Result<u64> {
        self.storage
            .incr_value(&keys::tx_stats(tx.type_name(), tx.day()))
            .await
    }

    /// Counts for `type_name` over `from_day..=to_day`. Missing days count zero.
    pub async fn get_tx_stats(
        &self,
        type_name: &str,
        from_day: u64,
        to_day: u64,
    ) -> Result<Vec<DailyCount>> {
        if from_day > to_day {
            return Ok(Vec::new());
        }
        if to_day - from_day >= MAX_STATS_DAYS {
            return Err(IndexerError::InvalidQuery(format!(
                "stats range of {} days exceeds the maximum of {}",
                to_day - from_day + 1,
                MAX_STATS_DAYS
            )));
        }

        let days: Vec<u64> = (from_day..=to_day).collect();
        let stat_keys: Vec<String> = days
            .iter()
            .map(|day| keys::tx_stats(type_name, *day))
            .collect();

        let values = self.storage.get_multiple_values(&stat_keys).await?;

        Ok(days
            .into_iter()
            .zip(values)
            .map(|(day, value)| DailyCount {
                day,
                count: value.and_then(|v| v.parse().ok()).unwrap_or(0),
            })
            .collect())
    }
}
