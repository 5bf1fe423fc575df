//! Project domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timefmt;

/// A project groups the updates published under one slug.
///
/// Projects are created on demand by the first upload that names their slug;
/// deleting one cascades to all of its updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    /// URL-safe identifier shared with the mobile app configuration.
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "timefmt::serde_millis")]
    pub created_at: DateTime<Utc>,
    /// Cached count of updates under this slug; maintained on create/delete.
    pub update_count: i64,
}
