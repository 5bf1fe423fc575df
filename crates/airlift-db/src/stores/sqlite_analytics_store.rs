//! `SQLite` implementation of the `AnalyticsStore` port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use sqlx::SqlitePool;

use airlift_core::domain::{DownloadEvent, StatsSummary};
use airlift_core::ports::{AnalyticsStore, StoreError};
use airlift_core::timefmt;

use super::row_mappers::storage_err;

/// `SQLite` implementation of the `AnalyticsStore` port.
pub struct SqliteAnalyticsStore {
    pool: SqlitePool,
}

impl SqliteAnalyticsStore {
    /// Create a new `SQLite` analytics store.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count_since(&self, since: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM download_log WHERE created_at >= ?")
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn grouped(&self, sql: &str) -> Result<BTreeMap<String, i64>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl AnalyticsStore for SqliteAnalyticsStore {
    async fn log(&self, event: DownloadEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO download_log (update_pk, platform, created_at, success, device_hash) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.update_pk)
        .bind(&event.platform)
        .bind(timefmt::format_utc_millis(&event.created_at))
        .bind(event.success)
        .bind(&event.device_hash)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn summary(&self) -> Result<StatsSummary, StoreError> {
        let now = Utc::now();
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = now - Duration::days(7);

        let total_downloads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_log")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let downloads_today = self
            .count_since(&timefmt::format_utc_millis(&today_start))
            .await?;
        let downloads_this_week = self
            .count_since(&timefmt::format_utc_millis(&week_start))
            .await?;

        let by_platform = self
            .grouped("SELECT platform, COUNT(*) FROM download_log GROUP BY platform")
            .await?;
        let by_channel = self
            .grouped(
                "SELECT u.channel, COUNT(*) FROM download_log d \
                 JOIN updates u ON u.id = d.update_pk GROUP BY u.channel",
            )
            .await?;
        let by_runtime = self
            .grouped(
                "SELECT u.runtime_version, COUNT(*) FROM download_log d \
                 JOIN updates u ON u.id = d.update_pk GROUP BY u.runtime_version",
            )
            .await?;

        let total_updates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM updates")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let total_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(StatsSummary {
            total_downloads,
            downloads_today,
            downloads_this_week,
            by_platform,
            by_channel,
            by_runtime,
            total_updates,
            total_projects,
        })
    }
}
