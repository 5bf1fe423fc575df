//! API key domain types.
//!
//! Keys gate the publishing endpoint. Only the hex SHA-256 of the plaintext
//! is ever persisted; the plaintext is returned exactly once at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timefmt;

/// A persisted API key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: i64,
    /// Human-readable label shown in listings.
    pub name: String,
    /// Hex SHA-256 of the plaintext key. Never serialized.
    #[serde(skip_serializing, default)]
    pub key_hash: String,
    /// First 8 chars of the plaintext, retained for display.
    pub key_prefix: String,
    /// Opaque scope tags.
    pub scopes: Vec<String>,
    #[serde(with = "timefmt::serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(
        with = "timefmt::serde_millis::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// The create-time pairing of a plaintext key with its record.
///
/// This is the only moment the plaintext exists outside the caller's hands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    /// The full plaintext key (`ota_` + 64 hex chars).
    pub key: String,
    pub api_key: ApiKey,
}
