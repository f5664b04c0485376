//! Last fully processed block height.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{keys, Storage};

/// Persists the processing height.
///
/// Saved after every transaction of a block has been indexed, so a restart
/// re-processes at most one block.
#[derive(Clone)]
pub struct Checkpoint {
    storage: Arc<dyn Storage>,
}

impl Checkpoint {
    /// Create a checkpoint tracker.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Read the saved height. A value that is not a height reads as `None`.
    pub async fn get_processing_height(&self) -> Result<Option<u64>> {
        let value = self.storage.get_value(&keys::processing_height()).await?;

        Ok(value.and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(height) => Some(height),
            Err(_) => {
                warn!("Ignoring unparsable processing height '{}'", raw);
                None
            }
        }))
    }

    /// Record `height` as fully processed.
    pub async fn save_processing_height(&self, height: u64) -> Result<()> {
        debug!("Checkpoint at block {}", height);
        self.storage
            .set_value(&keys::processing_height(), &height.to_string())
            .await
    }

    /// Forget the checkpoint. The next scan starts from the configured block.
    pub async fn clear_processing_height(&self) -> Result<()> {
        self.storage.del_value(&keys::processing_height()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_checkpoint_lifecycle() {
        let checkpoint = Checkpoint::new(Arc::new(MemoryStorage::new()));

        assert_eq!(checkpoint.get_processing_height().await.unwrap(), None);

        checkpoint.save_processing_height(41).await.unwrap();
        checkpoint.save_processing_height(42).await.unwrap();
        assert_eq!(checkpoint.get_processing_height().await.unwrap(), Some(42));

        checkpoint.clear_processing_height().await.unwrap();
        assert_eq!(checkpoint.get_processing_height().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_reads_as_none() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage
            .set_value(&keys::processing_height(), "not-a-height")
            .await
            .unwrap();

        let checkpoint = Checkpoint::new(storage);
        assert_eq!(checkpoint.get_processing_height().await.unwrap(), None);
    }
}
