//! Axum-specific error type and mappings.
//!
//! Every error leaves the server as JSON `{"error": "<message>"}` with the
//! matching status code; the only exceptions are protocol replies the
//! manifest endpoint shapes itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use airlift_bundle::BundleError;
use airlift_core::ports::StoreError;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Service unavailable (metadata store not connected).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl HttpError {
    /// The status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::ServiceUnavailable(msg)
            | Self::Internal(msg) => msg,
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::NotConnected => {
                Self::ServiceUnavailable("Metadata store is not connected".to_string())
            }
            StoreError::Storage(msg) => Self::Internal(format!("Storage: {msg}")),
            StoreError::Serialization(msg) => Self::Internal(format!("Serialization: {msg}")),
        }
    }
}

impl From<BundleError> for HttpError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::Archive(e) => Self::BadRequest(format!("Invalid bundle archive: {e}")),
            BundleError::MissingMetadata => {
                Self::BadRequest("Bundle is missing metadata.json".to_string())
            }
            BundleError::MalformedJson { file, source } => {
                Self::BadRequest(format!("Malformed {file}: {source}"))
            }
            BundleError::Io(e) => Self::Internal(format!("Unpack I/O error: {e}")),
        }
    }
}
