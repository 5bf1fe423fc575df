//! Composition utilities for building the store container with `SQLite`
//! backends. Pure construction, no domain logic.

use std::sync::Arc;

use sqlx::SqlitePool;

use airlift_core::ports::Stores;

use crate::stores::{
    SqliteAnalyticsStore, SqliteApiKeyStore, SqliteProjectStore, SqliteUpdateStore,
};

/// Factory for creating store instances with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Build all `SQLite` stores from a pool.
    ///
    /// This is the recommended way for adapters to obtain the store
    /// container; the returned `Stores` holds trait objects only.
    #[must_use]
    pub fn build_stores(pool: SqlitePool) -> Stores {
        Stores::new(
            Arc::new(SqliteUpdateStore::new(pool.clone())),
            Arc::new(SqliteProjectStore::new(pool.clone())),
            Arc::new(SqliteApiKeyStore::new(pool.clone())),
            Arc::new(SqliteAnalyticsStore::new(pool)),
        )
    }
}
