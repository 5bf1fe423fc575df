//! Download analytics types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One launch-asset download, append-only.
#[derive(Debug, Clone)]
pub struct DownloadEvent {
    /// Database identity of the downloaded update.
    pub update_pk: i64,
    pub platform: String,
    pub success: bool,
    pub device_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DownloadEvent {
    /// A successful download happening now.
    #[must_use]
    pub fn success_now(update_pk: i64, platform: String) -> Self {
        Self {
            update_pk,
            platform,
            success: true,
            device_hash: None,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated download statistics for the admin stats endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_downloads: i64,
    pub downloads_today: i64,
    pub downloads_this_week: i64,
    pub by_platform: BTreeMap<String, i64>,
    pub by_channel: BTreeMap<String, i64>,
    pub by_runtime: BTreeMap<String, i64>,
    pub total_updates: i64,
    pub total_projects: i64,
}
