//! Project store port.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::Project;

/// Persistence operations for projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert-on-missing upsert: an existing project keeps its fields.
    async fn ensure(&self, slug: &str, name: &str) -> Result<Project, StoreError>;

    async fn get(&self, slug: &str) -> Result<Option<Project>, StoreError>;

    async fn list(&self) -> Result<Vec<Project>, StoreError>;

    async fn delete(&self, slug: &str) -> Result<(), StoreError>;
}
