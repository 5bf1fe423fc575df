//! API key store port.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{ApiKey, IssuedApiKey};

/// Persistence operations for publishing keys.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Mint a key: 32 random bytes hex-encoded behind an `ota_` prefix.
    /// Only the SHA-256 of the plaintext is persisted, plus an 8-char
    /// display prefix. The plaintext is returned exactly once, here.
    async fn create(&self, name: &str, scopes: Vec<String>) -> Result<IssuedApiKey, StoreError>;

    /// Match a presented plaintext by hash. A hit updates `last_used_at`
    /// out of band; losses there are acceptable.
    async fn validate(&self, plaintext: &str) -> Result<Option<ApiKey>, StoreError>;

    async fn list(&self) -> Result<Vec<ApiKey>, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}
