//! Update domain types.
//!
//! An [`Update`] is the central entity of the server: one published build of
//! a project for a runtime version and channel, carrying content-addressed
//! file metadata. A record with `is_rollback` set is a rollback directive
//! instead of a shippable bundle and carries no metadata.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timefmt;

/// Target platform of an update record or a manifest request.
///
/// `All` is only valid on records: a record published for `all` matches
/// requests from either platform. Clients always request a concrete platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    All,
}

impl Platform {
    /// The lowercase wire form of the platform.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::All => "all",
        }
    }

    /// Parse a platform from its wire form. Returns `None` for anything else.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted update record.
///
/// Use [`NewUpdate`] for records that have not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    /// Stable database identity.
    pub id: i64,
    /// Client-visible update identifier (UUID-shaped, 8-4-4-4-12 hex).
    pub update_id: String,
    /// URL-safe project identifier.
    pub project_slug: String,
    /// Opaque runtime compatibility line; updates are only served to
    /// clients with a matching runtime.
    pub runtime_version: String,
    /// Release track. Conventionally production/staging/beta but the value
    /// is not validated to that set.
    pub channel: String,
    /// Platform the record was published for.
    pub platform: Platform,
    /// Creation time, UTC with millisecond precision on the wire.
    #[serde(with = "timefmt::serde_millis")]
    pub created_at: DateTime<Utc>,
    /// Toggled off to hide a record without deleting it.
    pub is_active: bool,
    /// Marks the record as a rollback directive rather than a bundle.
    pub is_rollback: bool,
    /// Fraction of eligible devices that receive this update, 0-100.
    pub rollout_percentage: i64,
    /// Launch-asset download counter. Incremented out of band and may lag.
    pub downloads: i64,
    /// Directory the unpacked bundle is served from when no object store
    /// is configured. Empty for CDN-served and rollback records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    /// Per-platform file maps. Absent on rollback records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UpdateMetadata>,
}

/// An update to be inserted (no database identity yet).
///
/// The store fills the defaults on create: channel `production`, rollout
/// 100 (clamped to 0-100), `created_at` now unless supplied.
#[derive(Debug, Clone)]
pub struct NewUpdate {
    pub update_id: String,
    pub project_slug: String,
    pub runtime_version: String,
    pub channel: Option<String>,
    pub platform: Platform,
    pub rollout_percentage: Option<i64>,
    pub is_rollback: bool,
    pub bundle_path: Option<PathBuf>,
    pub metadata: Option<UpdateMetadata>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewUpdate {
    /// A rollback directive record. Carries no metadata and no bundle path.
    #[must_use]
    pub fn rollback(
        update_id: String,
        project_slug: String,
        runtime_version: String,
        channel: Option<String>,
        platform: Platform,
    ) -> Self {
        Self {
            update_id,
            project_slug,
            runtime_version,
            channel,
            platform,
            rollout_percentage: None,
            is_rollback: true,
            bundle_path: None,
            metadata: None,
            created_at: None,
        }
    }
}

/// Mutable subset of an update record. Anything else is immutable after
/// creation (the download counter is incremented through its own path).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatch {
    pub is_active: Option<bool>,
    /// Clamped to 0-100 on write, never rejected.
    pub rollout_percentage: Option<i64>,
}

/// Filter for admin update listings. All fields are optional and combined
/// with AND; platform here is an exact match, unlike the serving lookup.
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    pub project_slug: Option<String>,
    pub runtime_version: Option<String>,
    pub channel: Option<String>,
    pub platform: Option<Platform>,
}

/// Per-platform file maps plus the project's expo configuration, stored
/// verbatim so the manifest can echo it under `extra.expoClient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadata {
    /// Keyed by the platform names found in the exported `metadata.json`.
    pub platforms: BTreeMap<String, PlatformBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expo_config: Option<serde_json::Value>,
}

/// The launch bundle and ordered asset list for one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformBundle {
    /// Bundle path relative to the unpacked build root, forward slashes.
    pub bundle_path: String,
    /// First 32 hex chars of the bundle's SHA-256.
    pub bundle_key: String,
    /// The same SHA-256 as URL-safe base64 without padding.
    pub bundle_hash: String,
    /// Secure CDN URL, empty when the bundle is served locally.
    #[serde(default)]
    pub bundle_url: String,
    pub assets: Vec<AssetFile>,
}

/// One static asset referenced by the launch bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFile {
    /// Path relative to the unpacked build root, forward slashes.
    pub path: String,
    /// File extension without the leading dot.
    pub ext: String,
    /// First 32 hex chars of the asset's SHA-256.
    pub key: String,
    /// The same SHA-256 as URL-safe base64 without padding.
    pub hash: String,
    /// Secure CDN URL, empty when the asset is served locally.
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parse_round_trips() {
        for p in [Platform::Android, Platform::Ios, Platform::All] {
            assert_eq!(Platform::parse(p.as_str()), Some(p));
        }
        assert_eq!(Platform::parse("windows"), None);
        assert_eq!(Platform::parse(""), None);
    }

    #[test]
    fn update_serializes_camel_case_with_millis() {
        let update = Update {
            id: 7,
            update_id: "2d711642-b726-b044-0162-7ca9fbac32f5".to_string(),
            project_slug: "demo".to_string(),
            runtime_version: "1".to_string(),
            channel: "production".to_string(),
            platform: Platform::Android,
            created_at: timefmt::parse_utc("2025-01-02T03:04:05.678Z").unwrap(),
            is_active: true,
            is_rollback: false,
            rollout_percentage: 100,
            downloads: 0,
            bundle_path: None,
            metadata: None,
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["updateId"], "2d711642-b726-b044-0162-7ca9fbac32f5");
        assert_eq!(json["createdAt"], "2025-01-02T03:04:05.678Z");
        assert_eq!(json["rolloutPercentage"], 100);
        assert!(json.get("bundlePath").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn patch_ignores_unknown_fields() {
        let patch: UpdatePatch =
            serde_json::from_str(r#"{"isActive":false,"downloads":999,"channel":"beta"}"#).unwrap();
        assert_eq!(patch.is_active, Some(false));
        assert_eq!(patch.rollout_percentage, None);
    }
}
