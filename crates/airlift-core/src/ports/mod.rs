//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or HTTP-client types in any signature
//! - Traits are minimal and CRUD-focused for stores
//! - The object store is a single capability interface; future backends
//!   implement the same operations

pub mod analytics_store;
pub mod api_key_store;
pub mod object_store;
pub mod project_store;
pub mod update_store;

use std::sync::Arc;
use thiserror::Error;

pub use analytics_store::AnalyticsStore;
pub use api_key_store::ApiKeyStore;
pub use object_store::{ObjectStore, ObjectStoreError};
pub use project_store::ProjectStore;
pub use update_store::UpdateStore;

/// Domain-specific errors for metadata store operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx
/// errors) and gives the HTTP adapter a clean mapping to status codes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No metadata store is connected; surfaced to clients as 503.
    #[error("Metadata store is not connected")]
    NotConnected,

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization of a stored document failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Container for all store trait objects.
///
/// Adapters receive one of these from the persistence factory so that no
/// handler is coupled to a concrete backend. The whole container is optional
/// at the server level: without a configured store URI the server still runs
/// with degraded functionality.
#[derive(Clone)]
pub struct Stores {
    pub updates: Arc<dyn UpdateStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub analytics: Arc<dyn AnalyticsStore>,
}

impl Stores {
    /// Create a new store container.
    #[must_use]
    pub fn new(
        updates: Arc<dyn UpdateStore>,
        projects: Arc<dyn ProjectStore>,
        api_keys: Arc<dyn ApiKeyStore>,
        analytics: Arc<dyn AnalyticsStore>,
    ) -> Self {
        Self {
            updates,
            projects,
            api_keys,
            analytics,
        }
    }
}
