//! Block scanner: replays unprocessed blocks in height order.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::NodeApi;
use crate::checkpoint::Checkpoint;
use crate::config::{MonitorConfig, StartingBlock};
use crate::error::Result;
use crate::index::IndexService;

/// Whether a scan pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Waiting for the next pass.
    Idle,
    /// A pass is running.
    Scanning,
}

/// Snapshot of the scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanState {
    /// A pass is in flight.
    pub processing: bool,
    /// Highest block known to be processed (or the starting point).
    pub last_block: u64,
}

impl ScanState {
    /// Observable status.
    pub fn status(&self) -> ScanStatus {
        if self.processing {
            ScanStatus::Scanning
        } else {
            ScanStatus::Idle
        }
    }
}

// Clears the processing flag when a pass ends, including on error
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives indexing from the node's block stream.
pub struct BlockScanner {
    node: Arc<dyn NodeApi>,
    index: IndexService,
    checkpoint: Checkpoint,
    config: MonitorConfig,
    processing: AtomicBool,
    last_block: AtomicU64,
}

impl BlockScanner {
    /// Create a new scanner.
    pub fn new(
        node: Arc<dyn NodeApi>,
        index: IndexService,
        checkpoint: Checkpoint,
        config: MonitorConfig,
    ) -> Self {
        Self {
            node,
            index,
            checkpoint,
            config,
            processing: AtomicBool::new(false),
            last_block: AtomicU64::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        ScanState {
            processing: self.processing.load(Ordering::Acquire),
            last_block: self.last_block.load(Ordering::Acquire),
        }
    }

    /// Resolve the starting point.
    ///
    /// A stored checkpoint is resumed from. `starting_block` is only
    /// consulted when there is none.
    pub async fn init(&self) -> Result<()> {
        let checkpoint = match self.checkpoint.get_processing_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!("Failed to read checkpoint, using starting block: {}", e);
                None
            }
        };

        let last_block = match (checkpoint, self.config.starting_block) {
            (Some(height), _) => height,
            (None, StartingBlock::Height(height)) => height.saturating_sub(1),
            (None, StartingBlock::Last) => self.node.get_last_block_height().await?,
        };
        self.last_block.store(last_block, Ordering::Release);

        info!(
            "Scanner initialized (starting_block={}, checkpoint={:?}, last_block={})",
            self.config.starting_block, checkpoint, last_block
        );
        Ok(())
    }

    /// Run forever: one pass, then sleep `interval_ms`.
    ///
    /// Returns only when a pass fails. Restarting is left to the caller.
    pub async fn start(&self) -> Result<()> {
        self.init().await?;

        let interval = Duration::from_millis(self.config.interval_ms);
        info!("Block scanner starting (interval {:?})", interval);

        loop {
            if !self.processing.load(Ordering::Acquire) {
                self.scan().await?;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One scan pass. Returns the number of blocks processed.
    ///
    /// A pass requested while another is running does nothing.
    pub async fn scan(&self) -> Result<u64> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Scan already in progress, skipping");
            return Ok(0);
        }
        let _guard = PassGuard(&self.processing);

        let current = self.node.get_last_block_height().await?;

        let checkpoint = match self.checkpoint.get_processing_height().await {
            Ok(height) => height.unwrap_or(0),
            Err(e) => {
                warn!("Failed to read checkpoint, using last known block: {}", e);
                0
            }
        };

        let next = checkpoint.max(self.last_block.load(Ordering::Acquire)) + 1;
        if next > current {
            debug!("Up to date at block {}", current);
            return Ok(0);
        }

        info!("Processing blocks {} to {}", next, current);

        for height in next..=current {
            self.process_block(height).await?;
        }

        Ok(current - next + 1)
    }

    async fn process_block(&self, height: u64) -> Result<()> {
        let block = self.node.get_block(height).await?;

        for tx in &block.transactions {
            self.index.index(tx).await?;
        }

        self.checkpoint.save_processing_height(height).await?;
        self.last_block.store(height, Ordering::Release);

        debug!(
            "Block {} done ({} transactions)",
            height,
            block.transactions.len()
        );
        Ok(())
    }
}
