//! Core domain for the airlift OTA update server.
//!
//! This crate holds the domain types (updates, projects, API keys, download
//! analytics), the store ports that persistence adapters implement, and the
//! protocol primitives shared by every adapter: content hashing, manifest
//! signing, rollout bucketing, timestamp formatting, and content-type
//! inference. It knows nothing about HTTP, SQL, or any CDN.

#![deny(unsafe_code)]

pub mod domain;
pub mod hashing;
pub mod ports;
pub mod rollout;
pub mod signing;
pub mod timefmt;
pub mod utils;

// Re-export commonly used types for convenience
pub use domain::{
    ApiKey, AssetFile, DownloadEvent, IssuedApiKey, NewUpdate, Platform, PlatformBundle, Project,
    StatsSummary, Update, UpdateFilter, UpdateMetadata, UpdatePatch,
};
pub use ports::{
    AnalyticsStore, ApiKeyStore, ObjectStore, ObjectStoreError, ProjectStore, StoreError, Stores,
    UpdateStore,
};
pub use rollout::RolloutSelector;
pub use signing::{ManifestSigner, SigningError};
