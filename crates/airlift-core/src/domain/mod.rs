//! Domain types for updates, projects, API keys, and download analytics.
//!
//! These types are independent of any infrastructure concern (database,
//! filesystem, CDN). Wire serialization uses camelCase field names because
//! the same structs are returned verbatim from the admin and ingestion APIs.

mod analytics;
mod api_key;
mod project;
mod update;

pub use analytics::{DownloadEvent, StatsSummary};
pub use api_key::{ApiKey, IssuedApiKey};
pub use project::Project;
pub use update::{
    AssetFile, NewUpdate, Platform, PlatformBundle, Update, UpdateFilter, UpdateMetadata,
    UpdatePatch,
};
