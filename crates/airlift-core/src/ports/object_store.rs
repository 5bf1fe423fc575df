//! Object store (CDN) capability port.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Object store failure.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The request never completed (network, cancellation).
    #[error("Object store request failed: {0}")]
    Request(String),

    /// The service answered with something other than success.
    #[error("Object store rejected the operation: {0}")]
    Rejected(String),

    /// Reading local bytes to upload failed.
    #[error("Object store I/O error: {0}")]
    Io(String),
}

/// Upload and delete capability against a CDN-backed object store.
///
/// One concrete implementation exists today; future backends implement the
/// same operations. The adapter is optional — when it is not configured the
/// ingestion pipeline falls through to local filesystem serving.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload one file under `remote_path` (forward slashes) and return its
    /// secure public URL.
    async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<String, ObjectStoreError>;

    /// Upload a directory tree under a logical folder, preserving relative
    /// paths with forward-slash normalization. Returns relative path →
    /// secure public URL for every uploaded file.
    async fn upload_tree(
        &self,
        root: &Path,
        folder: &str,
    ) -> Result<HashMap<String, String>, ObjectStoreError>;

    /// Delete every asset under a folder prefix, then the folder itself.
    async fn delete_folder(&self, folder: &str) -> Result<(), ObjectStoreError>;
}
