//! `SQLite` persistence for the airlift metadata store.
//!
//! Implements the store ports from `airlift-core` over a `sqlx` pool. The
//! schema is created on connect; everything is safe to run repeatedly.

#![deny(unsafe_code)]

pub mod factory;
pub mod setup;
pub mod stores;

// Re-export factory for convenient access
pub use factory::StoreFactory;

// Re-export store implementations
pub use stores::{
    SqliteAnalyticsStore, SqliteApiKeyStore, SqliteProjectStore, SqliteUpdateStore,
};

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
