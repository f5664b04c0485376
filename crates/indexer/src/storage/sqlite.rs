//! SQLite storage backend.
//!
//! Persists every keyspace in its own table. Ranked transaction sequences rely
//! on an `AUTOINCREMENT` row id as the rank.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::{Document, Storage};
use crate::error::{IndexerError, Result};

/// Database storage for the indexer.
///
/// Provides async access to SQLite database with connection pooling.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new storage instance with the given database URL.
    ///
    /// The database file is created if it doesn't exist. Call
    /// [`run_migrations`](Self::run_migrations) before use.
    ///
    /// # Arguments
    /// * `database_url` - SQLite database URL (e.g., "sqlite://lto-index.db")
    /// * `max_connections` - Pool upper bound (default 5)
    /// * `min_connections` - Pool lower bound (default 1)
    ///
    /// # Example
    /// ```no_run
    /// # use lto_indexer::storage::SqliteStorage;
    /// # async fn example() -> lto_indexer::error::Result<()> {
    /// let storage = SqliteStorage::new("sqlite://lto-index.db", None, None).await?;
    /// storage.run_migrations().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        database_url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.unwrap_or(5))
            .min_connections(min_connections.unwrap_or(1))
            .connect_with(options)
            .await?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Create a new storage instance with a specific file path.
    pub async fn new_with_path<P: AsRef<Path>>(
        path: P,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self> {
        let database_url = format!("sqlite://{}", path.as_ref().display());
        Self::new(&database_url, max_connections, min_connections).await
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        info!("Migrations completed successfully");

        Ok(())
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_object(&self, key: &str) -> Result<Document> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM objects WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw)? {
                serde_json::Value::Object(doc) => Ok(doc),
                _ => Ok(Document::new()),
            },
            None => Ok(Document::new()),
        }
    }

    async fn add_object(&self, key: &str, value: &Document) -> Result<()> {
        let raw = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO objects (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn del_value(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_multiple_values(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_value(key).await?);
        }
        Ok(values)
    }

    async fn incr_value(&self, key: &str) -> Result<u64> {
        // Single statement, so concurrent increments cannot lose updates.
        // A non-integer value matches no row and is left untouched.
        let row = sqlx::query(
            r#"
            INSERT INTO kv (key, value)
            VALUES (?, '1')
            ON CONFLICT(key) DO UPDATE SET value = CAST(kv.value AS INTEGER) + 1
                WHERE kv.value GLOB '[0-9]*' AND kv.value NOT GLOB '*[^0-9]*'
            RETURNING CAST(value AS INTEGER) AS value
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| IndexerError::storage(format!("value at {} is not an integer", key)))?;

        let value: i64 = row.try_get("value")?;
        u64::try_from(value)
            .map_err(|_| IndexerError::storage(format!("counter {} is negative", key)))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO set_members (key, member) VALUES (?, ?)")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        sqlx::query("DELETE FROM set_members WHERE key = ? AND member = ?")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_array(&self, key: &str) -> Result<Vec<String>> {
        let members =
            sqlx::query_scalar("SELECT member FROM set_members WHERE key = ? ORDER BY member")
                .bind(key)
                .fetch_all(&self.pool)
                .await?;

        Ok(members)
    }

    async fn index_tx(
        &self,
        tx_type: &str,
        address: &str,
        tx_id: &str,
        timestamp: u64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tx_index (tx_type, address, tx_id, timestamp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(tx_type, address, tx_id) DO NOTHING
            "#,
        )
        .bind(tx_type)
        .bind(address)
        .bind(tx_id)
        .bind(timestamp as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_tx(
        &self,
        tx_type: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT tx_id
            FROM tx_index
            WHERE tx_type = ? AND address = ?
            ORDER BY rank ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(tx_type)
        .bind(address)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn count_tx(&self, tx_type: &str, address: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tx_index WHERE tx_type = ? AND address = ?")
                .bind(tx_type)
                .bind(address)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn close(&self) {
        info!("Closing database connection");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use tempfile::NamedTempFile;

    async fn setup_storage() -> (SqliteStorage, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let storage = SqliteStorage::new_with_path(temp_db.path(), None, None)
            .await
            .unwrap();
        storage.run_migrations().await.unwrap();
        (storage, temp_db)
    }

    #[tokio::test]
    async fn test_storage_creation() {
        let (storage, _temp_db) = setup_storage().await;
        storage.health_check().await.unwrap();
        storage.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_contract() {
        let (storage, _temp_db) = setup_storage().await;
        contract::check_all(&storage).await;
        storage.close().await;
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_db = NamedTempFile::new().unwrap();

        let storage = SqliteStorage::new_with_path(temp_db.path(), None, None)
            .await
            .unwrap();
        storage.run_migrations().await.unwrap();
        storage.set_value("lto:processing-height", "42").await.unwrap();
        storage.index_tx("anchor", "3Na", "t1", 1).await.unwrap();
        storage.close().await;

        let storage = SqliteStorage::new_with_path(temp_db.path(), None, None)
            .await
            .unwrap();
        storage.run_migrations().await.unwrap();
        assert_eq!(
            storage.get_value("lto:processing-height").await.unwrap(),
            Some("42".to_string())
        );

        // Ranks continue after the highest persisted rank
        storage.index_tx("anchor", "3Na", "t2", 2).await.unwrap();
        assert_eq!(
            storage.get_tx("anchor", "3Na", 10, 0).await.unwrap(),
            vec!["t1", "t2"]
        );
        storage.close().await;
    }

    #[tokio::test]
    async fn test_non_object_document_reads_empty() {
        let (storage, _temp_db) = setup_storage().await;

        sqlx::query("INSERT INTO objects (key, value) VALUES ('lto:roles:3Nx', '[1,2]')")
            .execute(&storage.pool)
            .await
            .unwrap();

        assert!(storage.get_object("lto:roles:3Nx").await.unwrap().is_empty());
        storage.close().await;
    }
}
