//! Download analytics port.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{DownloadEvent, StatsSummary};

/// Append-only download log plus aggregation.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn log(&self, event: DownloadEvent) -> Result<(), StoreError>;

    async fn summary(&self) -> Result<StatsSummary, StoreError>;
}
