//! `SQLite` implementation of the `UpdateStore` port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use airlift_core::domain::{NewUpdate, Platform, Update, UpdateFilter, UpdatePatch};
use airlift_core::ports::{StoreError, UpdateStore};
use airlift_core::timefmt;

use super::row_mappers::{UPDATE_COLUMNS, row_to_update, storage_err};

/// `SQLite` implementation of the `UpdateStore` port.
pub struct SqliteUpdateStore {
    pool: SqlitePool,
}

impl SqliteUpdateStore {
    /// Create a new `SQLite` update store.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Update>, StoreError> {
        let query = format!("SELECT {UPDATE_COLUMNS} FROM updates WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_update).transpose()
    }

    fn filter_clause(filter: &UpdateFilter) -> (String, Vec<String>) {
        let mut conditions: Vec<&'static str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        if let Some(slug) = &filter.project_slug {
            conditions.push("project_slug = ?");
            binds.push(slug.clone());
        }
        if let Some(runtime) = &filter.runtime_version {
            conditions.push("runtime_version = ?");
            binds.push(runtime.clone());
        }
        if let Some(channel) = &filter.channel {
            conditions.push("channel = ?");
            binds.push(channel.clone());
        }
        if let Some(platform) = filter.platform {
            conditions.push("platform = ?");
            binds.push(platform.as_str().to_string());
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, binds)
    }
}

#[async_trait]
impl UpdateStore for SqliteUpdateStore {
    async fn create(&self, new: NewUpdate) -> Result<Update, StoreError> {
        let channel = new.channel.unwrap_or_else(|| "production".to_string());
        let rollout = new.rollout_percentage.unwrap_or(100).clamp(0, 100);
        let created_at = new.created_at.unwrap_or_else(Utc::now);

        let metadata_json = new
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO updates (
                update_id, project_slug, runtime_version, channel, platform,
                created_at, is_active, is_rollback, rollout_percentage, downloads,
                bundle_path, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, 0, ?, ?)"#,
        )
        .bind(&new.update_id)
        .bind(&new.project_slug)
        .bind(&new.runtime_version)
        .bind(&channel)
        .bind(new.platform.as_str())
        .bind(timefmt::format_utc_millis(&created_at))
        .bind(new.is_rollback)
        .bind(rollout)
        .bind(new.bundle_path.as_ref().map(|p| p.to_string_lossy().to_string()))
        .bind(&metadata_json)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        // Keep the project's cached counter in step
        sqlx::query("UPDATE projects SET update_count = update_count + 1 WHERE slug = ?")
            .bind(&new.project_slug)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        let id = result.last_insert_rowid();
        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| StoreError::Storage(format!("inserted update {id} vanished")))
    }

    async fn find_latest(
        &self,
        project_slug: &str,
        runtime_version: &str,
        channel: &str,
        platform: Platform,
    ) -> Result<Option<Update>, StoreError> {
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM updates \
             WHERE project_slug = ? AND runtime_version = ? AND channel = ? \
               AND is_active = 1 AND platform IN (?, 'all') \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(project_slug)
            .bind(runtime_version)
            .bind(channel)
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_update).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Update>, StoreError> {
        self.fetch_by_id(id).await
    }

    async fn find_by_update_id(&self, update_id: &str) -> Result<Option<Update>, StoreError> {
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM updates WHERE update_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(update_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_update).transpose()
    }

    async fn list(
        &self,
        filter: &UpdateFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Update>, i64), StoreError> {
        let (clause, binds) = Self::filter_clause(filter);

        let count_sql = format!("SELECT COUNT(*) FROM updates{clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = count_query.fetch_one(&self.pool).await.map_err(storage_err)?;

        let list_sql = format!(
            "SELECT {UPDATE_COLUMNS} FROM updates{clause} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query(&list_sql);
        for bind in &binds {
            list_query = list_query.bind(bind);
        }
        let rows = list_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let updates = rows.iter().map(row_to_update).collect::<Result<_, _>>()?;
        Ok((updates, total))
    }

    async fn patch(&self, id: i64, patch: UpdatePatch) -> Result<Update, StoreError> {
        let existing = self
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Update {id}")))?;

        let is_active = patch.is_active.unwrap_or(existing.is_active);
        let rollout = patch
            .rollout_percentage
            .unwrap_or(existing.rollout_percentage)
            .clamp(0, 100);

        sqlx::query("UPDATE updates SET is_active = ?, rollout_percentage = ? WHERE id = ?")
            .bind(is_active)
            .bind(rollout)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Update {id}")))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let slug: Option<String> =
            sqlx::query_scalar("SELECT project_slug FROM updates WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;

        sqlx::query("DELETE FROM updates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if let Some(slug) = slug {
            sqlx::query(
                "UPDATE projects SET update_count = MAX(update_count - 1, 0) WHERE slug = ?",
            )
            .bind(&slug)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        }
        Ok(())
    }

    async fn delete_by_project(&self, project_slug: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM updates WHERE project_slug = ?")
            .bind(project_slug)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query("UPDATE projects SET update_count = 0 WHERE slug = ?")
            .bind(project_slug)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(result.rows_affected())
    }

    async fn increment_downloads(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE updates SET downloads = downloads + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
