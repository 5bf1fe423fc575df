//! `SQLite` implementations of the airlift store ports.

mod row_mappers;
mod sqlite_analytics_store;
mod sqlite_api_key_store;
mod sqlite_project_store;
mod sqlite_update_store;

pub use sqlite_analytics_store::SqliteAnalyticsStore;
pub use sqlite_api_key_store::SqliteApiKeyStore;
pub use sqlite_project_store::SqliteProjectStore;
pub use sqlite_update_store::SqliteUpdateStore;
