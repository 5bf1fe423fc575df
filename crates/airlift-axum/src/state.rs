//! Shared application state type.

use crate::bootstrap::ServerContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// An Arc-wrapped [`ServerContext`] holding the stores, the object store,
/// the signer, and the rollout selector.
pub type AppState = Arc<ServerContext>;
