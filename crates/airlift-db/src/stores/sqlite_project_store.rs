//! `SQLite` implementation of the `ProjectStore` port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use airlift_core::domain::Project;
use airlift_core::ports::{ProjectStore, StoreError};
use airlift_core::timefmt;

use super::row_mappers::{row_to_project, storage_err};

const PROJECT_COLUMNS: &str = "id, slug, name, description, created_at, update_count";

/// `SQLite` implementation of the `ProjectStore` port.
pub struct SqliteProjectStore {
    pool: SqlitePool,
}

impl SqliteProjectStore {
    /// Create a new `SQLite` project store.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn ensure(&self, slug: &str, name: &str) -> Result<Project, StoreError> {
        // Insert-on-missing only; an existing row keeps its fields
        sqlx::query(
            "INSERT INTO projects (slug, name, created_at, update_count) VALUES (?, ?, ?, 0) \
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(slug)
        .bind(name)
        .bind(timefmt::format_utc_millis(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        self.get(slug)
            .await?
            .ok_or_else(|| StoreError::Storage(format!("project {slug} vanished after ensure")))
    }

    async fn get(&self, slug: &str) -> Result<Option<Project>, StoreError> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?");
        let row = sqlx::query(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_project).transpose()
    }

    async fn list(&self) -> Result<Vec<Project>, StoreError> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_project).collect()
    }

    async fn delete(&self, slug: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM projects WHERE slug = ?")
            .bind(slug)
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
    async fn ensure_creates_then_preserves() {
        let store = SqliteProjectStore::new(setup_test_database().await.unwrap());

        let first = store.ensure("demo", "demo").await.unwrap();
        assert_eq!(first.slug, "demo");
        assert_eq!(first.name, "demo");
        assert_eq!(first.update_count, 0);

        // A later ensure with a different name must not overwrite
        let second = store.ensure("demo", "renamed").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "demo");
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = SqliteProjectStore::new(setup_test_database().await.unwrap());
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = SqliteProjectStore::new(setup_test_database().await.unwrap());
        store.ensure("demo", "demo").await.unwrap();
        store.delete("demo").await.unwrap();
        assert!(store.get("demo").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }
}
