//! Row-to-domain mapping helpers shared by the store implementations.

use std::path::PathBuf;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use airlift_core::domain::{ApiKey, Platform, Project, Update, UpdateMetadata};
use airlift_core::ports::StoreError;
use airlift_core::timefmt;
use chrono::{DateTime, Utc};

/// Column list matching `row_to_update`.
pub(crate) const UPDATE_COLUMNS: &str = "id, update_id, project_slug, runtime_version, channel, \
     platform, created_at, is_active, is_rollback, rollout_percentage, downloads, bundle_path, \
     metadata";

pub(crate) fn storage_err(e: sqlx::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    timefmt::parse_utc(value)
        .map_err(|e| StoreError::Serialization(format!("bad timestamp '{value}': {e}")))
}

pub(crate) fn row_to_update(row: &SqliteRow) -> Result<Update, StoreError> {
    let platform_text: String = row.try_get("platform").map_err(storage_err)?;
    let platform = Platform::parse(&platform_text)
        .ok_or_else(|| StoreError::Serialization(format!("bad platform '{platform_text}'")))?;

    let created_at_text: String = row.try_get("created_at").map_err(storage_err)?;

    let metadata_json: Option<String> = row.try_get("metadata").map_err(storage_err)?;
    let metadata: Option<UpdateMetadata> = metadata_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let bundle_path: Option<String> = row.try_get("bundle_path").map_err(storage_err)?;

    Ok(Update {
        id: row.try_get("id").map_err(storage_err)?,
        update_id: row.try_get("update_id").map_err(storage_err)?,
        project_slug: row.try_get("project_slug").map_err(storage_err)?,
        runtime_version: row.try_get("runtime_version").map_err(storage_err)?,
        channel: row.try_get("channel").map_err(storage_err)?,
        platform,
        created_at: parse_timestamp(&created_at_text)?,
        is_active: row.try_get("is_active").map_err(storage_err)?,
        is_rollback: row.try_get("is_rollback").map_err(storage_err)?,
        rollout_percentage: row.try_get("rollout_percentage").map_err(storage_err)?,
        downloads: row.try_get("downloads").map_err(storage_err)?,
        bundle_path: bundle_path.filter(|p| !p.is_empty()).map(PathBuf::from),
        metadata,
    })
}

pub(crate) fn row_to_project(row: &SqliteRow) -> Result<Project, StoreError> {
    let created_at_text: String = row.try_get("created_at").map_err(storage_err)?;
    Ok(Project {
        id: row.try_get("id").map_err(storage_err)?,
        slug: row.try_get("slug").map_err(storage_err)?,
        name: row.try_get("name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        created_at: parse_timestamp(&created_at_text)?,
        update_count: row.try_get("update_count").map_err(storage_err)?,
    })
}

pub(crate) fn row_to_api_key(row: &SqliteRow) -> Result<ApiKey, StoreError> {
    let created_at_text: String = row.try_get("created_at").map_err(storage_err)?;
    let last_used_text: Option<String> = row.try_get("last_used_at").map_err(storage_err)?;
    let scopes_json: String = row.try_get("scopes").map_err(storage_err)?;
    let scopes: Vec<String> = serde_json::from_str(&scopes_json)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(ApiKey {
        id: row.try_get("id").map_err(storage_err)?,
        name: row.try_get("name").map_err(storage_err)?,
        key_hash: row.try_get("key_hash").map_err(storage_err)?,
        key_prefix: row.try_get("key_prefix").map_err(storage_err)?,
        scopes,
        created_at: parse_timestamp(&created_at_text)?,
        last_used_at: last_used_text.as_deref().map(parse_timestamp).transpose()?,
    })
}
