//! `SQLite` implementation of the `ApiKeyStore` port.

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use sqlx::SqlitePool;

use airlift_core::domain::{ApiKey, IssuedApiKey};
use airlift_core::hashing::{hex_encode, sha256_hex};
use airlift_core::ports::{ApiKeyStore, StoreError};
use airlift_core::timefmt;

use super::row_mappers::{row_to_api_key, storage_err};

const API_KEY_COLUMNS: &str = "id, name, key_hash, key_prefix, scopes, created_at, last_used_at";

/// Length of the display prefix retained for listings.
const PREFIX_LEN: usize = 8;

/// `SQLite` implementation of the `ApiKeyStore` port.
pub struct SqliteApiKeyStore {
    pool: SqlitePool,
}

impl SqliteApiKeyStore {
    /// Create a new `SQLite` API key store.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = ?");
        let row = sqlx::query(&query)
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_api_key).transpose()
    }
}

#[async_trait]
impl ApiKeyStore for SqliteApiKeyStore {
    async fn create(&self, name: &str, scopes: Vec<String>) -> Result<IssuedApiKey, StoreError> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        let plaintext = format!("ota_{}", hex_encode(&secret));
        let key_hash = sha256_hex(plaintext.as_bytes());
        let key_prefix = plaintext[..PREFIX_LEN].to_string();

        let scopes_json = serde_json::to_string(&scopes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            "INSERT INTO api_keys (name, key_hash, key_prefix, scopes, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(&key_hash)
        .bind(&key_prefix)
        .bind(&scopes_json)
        .bind(timefmt::format_utc_millis(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        let api_key = self
            .fetch_by_hash(&key_hash)
            .await?
            .ok_or_else(|| StoreError::Storage("inserted API key vanished".to_string()))?;

        Ok(IssuedApiKey {
            key: plaintext,
            api_key,
        })
    }

    async fn validate(&self, plaintext: &str) -> Result<Option<ApiKey>, StoreError> {
        let key_hash = sha256_hex(plaintext.as_bytes());
        let found = self.fetch_by_hash(&key_hash).await?;

        if let Some(key) = &found {
            // Touch last_used_at out of band; a lost write is acceptable
            let pool = self.pool.clone();
            let id = key.id;
            tokio::spawn(async move {
                let result = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
                    .bind(timefmt::format_utc_millis(&Utc::now()))
                    .bind(id)
                    .execute(&pool)
                    .await;
                if let Err(e) = result {
                    tracing::debug!("last_used_at update for key {id} failed: {e}");
                }
            });
        }

        Ok(found)
    }

    async fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys ORDER BY created_at DESC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_api_key).collect()
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM api_keys WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn create_issues_a_prefixed_key_and_stores_only_the_hash() {
        let store = SqliteApiKeyStore::new(setup_test_database().await.unwrap());
        let issued = store
            .create("ci-publisher", vec!["publish".to_string()])
            .await
            .unwrap();

        assert!(issued.key.starts_with("ota_"));
        assert_eq!(issued.key.len(), 4 + 64);
        assert_eq!(issued.api_key.key_prefix, &issued.key[..8]);
        assert_eq!(issued.api_key.key_hash, sha256_hex(issued.key.as_bytes()));
        assert_eq!(issued.api_key.scopes, vec!["publish".to_string()]);

        // The plaintext never lands in the table
        let stored: Vec<String> = sqlx::query_scalar("SELECT key_hash FROM api_keys")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(stored, vec![issued.api_key.key_hash.clone()]);
    }

    #[tokio::test]
    async fn validate_matches_by_hash() {
        let store = SqliteApiKeyStore::new(setup_test_database().await.unwrap());
        let issued = store.create("publisher", Vec::new()).await.unwrap();

        let hit = store.validate(&issued.key).await.unwrap();
        assert_eq!(hit.unwrap().id, issued.api_key.id);

        let miss = store.validate("ota_0000000000").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn deleted_keys_stop_validating() {
        let store = SqliteApiKeyStore::new(setup_test_database().await.unwrap());
        let issued = store.create("publisher", Vec::new()).await.unwrap();

        store.delete(issued.api_key.id).await.unwrap();
        assert!(store.validate(&issued.key).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }
}
