//! Database setup and initialization.
//!
//! `setup_database()` connects to the store URI from configuration and
//! ensures the full schema exists. The composition root calls it once at
//! startup; a failure there downgrades the server to store-less operation
//! instead of stopping it.

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

/// Connect to the `SQLite` database behind `database_url` and ensure the
/// schema exists. The database file is created when missing.
pub async fn setup_database(database_url: &str) -> Result<SqlitePool> {
    let options: SqliteConnectOptions = database_url.parse::<SqliteConnectOptions>()?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database with the full production schema, for tests.
///
/// In-memory `SQLite` gives every connection its own database, so the pool
/// is pinned to a single connection.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete database schema.
///
/// Safe to call multiple times; all statements use IF NOT EXISTS.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Update records. created_at is stored in the fixed-width millisecond
    // format, so text ordering is chronological.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS updates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            update_id TEXT NOT NULL,
            project_slug TEXT NOT NULL,
            runtime_version TEXT NOT NULL,
            channel TEXT NOT NULL DEFAULT 'production',
            platform TEXT NOT NULL DEFAULT 'all',
            created_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_rollback INTEGER NOT NULL DEFAULT 0,
            rollout_percentage INTEGER NOT NULL DEFAULT 100,
            downloads INTEGER NOT NULL DEFAULT 0,
            bundle_path TEXT,
            metadata TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Covering index for the serving lookup
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_updates_serving \
         ON updates(project_slug, runtime_version, channel, is_active, created_at)",
    )
    .execute(pool)
    .await?;

    // Client-visible identifier lookups from the admin surface
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_updates_update_id ON updates(update_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            update_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            key_hash TEXT NOT NULL,
            key_prefix TEXT NOT NULL,
            scopes TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            last_used_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Hash is the only lookup path for key validation
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_api_keys_hash ON api_keys(key_hash)")
        .execute(pool)
        .await?;

    // Append-only download log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS download_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            update_pk INTEGER NOT NULL,
            platform TEXT NOT NULL,
            created_at TEXT NOT NULL,
            success INTEGER NOT NULL DEFAULT 1,
            device_hash TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_download_log_time ON download_log(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_download_log_update ON download_log(update_pk)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_database() {
        let pool = setup_test_database().await.unwrap();

        // Verify tables exist by querying them
        for table in ["updates", "projects", "api_keys", "download_log"] {
            let _: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = setup_test_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }
}
