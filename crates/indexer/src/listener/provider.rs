//! Node REST client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use lto_index_core::Block;

use crate::config::NodeConfig;
use crate::error::{IndexerError, Result};

/// Block source consumed by the scanner.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Current chain height.
    async fn get_last_block_height(&self) -> Result<u64>;

    /// Block at `height`. Fails if the height has not been produced yet.
    async fn get_block(&self, height: u64) -> Result<Block>;
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    height: u64,
}

/// HTTP client for the public node API.
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NodeClient {
    /// Create a new node client.
    pub fn new(config: &NodeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lto-indexer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(IndexerError::node)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexerError::node(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IndexerError::node(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IndexerError::node(format!("Invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn get_last_block_height(&self) -> Result<u64> {
        let response: HeightResponse = self.get_json("/blocks/height").await?;
        Ok(response.height)
    }

    async fn get_block(&self, height: u64) -> Result<Block> {
        self.get_json(&format!("/blocks/at/{}", height)).await
    }
}
