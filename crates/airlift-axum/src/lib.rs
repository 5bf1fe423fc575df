//! Axum HTTP adapter for the airlift OTA update server.
//!
//! Implements the Expo update protocol surface: the manifest negotiation
//! endpoint with signed multipart replies, the content-addressed asset
//! endpoint with download accounting, the bundle ingestion pipeline, the
//! bearer-gated admin surface, and the health probe.

#![deny(unsafe_code)]

pub mod auth;
pub mod bootstrap;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{ServerConfig, ServerContext, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
