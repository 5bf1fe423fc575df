//! The `metadata.json` document written by the Expo export tool.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level export metadata. Unknown fields (`version`, `bundler`, future
/// additions) are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub file_metadata: BTreeMap<String, PlatformFiles>,
}

/// File map for one platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformFiles {
    /// Launch bundle path relative to the build root.
    pub bundle: String,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

/// One asset reference: relative path plus its extension.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRef {
    pub path: String,
    pub ext: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_two_platform_export() {
        let metadata: BundleMetadata = serde_json::from_str(
            r#"{
                "version": 0,
                "bundler": "metro",
                "fileMetadata": {
                    "ios": {
                        "bundle": "bundles/ios-deadbeef.hbc",
                        "assets": []
                    },
                    "android": {
                        "bundle": "bundles/android-cafebabe.js",
                        "assets": [
                            {"path": "assets/aa11", "ext": "png"},
                            {"path": "assets/bb22", "ext": "ttf"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(metadata.file_metadata.len(), 2);
        let android = &metadata.file_metadata["android"];
        assert_eq!(android.bundle, "bundles/android-cafebabe.js");
        assert_eq!(android.assets[1].ext, "ttf");
        assert!(metadata.file_metadata["ios"].assets.is_empty());
    }

    #[test]
    fn assets_default_to_empty() {
        let metadata: BundleMetadata = serde_json::from_str(
            r#"{"fileMetadata": {"android": {"bundle": "bundles/android-a.js"}}}"#,
        )
        .unwrap();
        assert!(metadata.file_metadata["android"].assets.is_empty());
    }
}
