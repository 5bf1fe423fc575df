//! Update store port.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{NewUpdate, Platform, Update, UpdateFilter, UpdatePatch};

/// Persistence operations for update records.
#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Insert a record, filling defaults: channel `production`, rollout 100
    /// (clamped to 0-100), `created_at` now unless supplied.
    async fn create(&self, new: NewUpdate) -> Result<Update, StoreError>;

    /// The newest active record matching the serving key. `platform` matches
    /// records published for the requested platform OR for `all`; ties break
    /// newest `created_at` first.
    async fn find_latest(
        &self,
        project_slug: &str,
        runtime_version: &str,
        channel: &str,
        platform: Platform,
    ) -> Result<Option<Update>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Update>, StoreError>;

    /// Lookup by the client-visible identifier, newest first when the id was
    /// reused across channels.
    async fn find_by_update_id(&self, update_id: &str) -> Result<Option<Update>, StoreError>;

    /// Newest-first page of records matching `filter`, plus the unpaged total.
    async fn list(
        &self,
        filter: &UpdateFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Update>, i64), StoreError>;

    /// Apply the mutable subset. Rollout percentages are clamped silently.
    async fn patch(&self, id: i64, patch: UpdatePatch) -> Result<Update, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Delete every record under a project slug; returns how many went.
    async fn delete_by_project(&self, project_slug: &str) -> Result<u64, StoreError>;

    /// Fire-and-forget download accounting; not required to be strongly
    /// consistent.
    async fn increment_downloads(&self, id: i64) -> Result<(), StoreError>;

    /// Cheap connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
