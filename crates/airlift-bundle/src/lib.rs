//! Unpacking of Expo export bundles.
//!
//! A publisher uploads the ZIP produced by the Expo export tool. This crate
//! extracts it, normalizes the root so `metadata.json` sits at the top of the
//! returned directory, and parses the platform-keyed file map plus the
//! optional `expoConfig.json`.
//!
//! Export tools differ in how they wrap the tree, so two heuristics run in
//! order after extraction: a single wrapping directory is descended into,
//! and failing that a `dist/` sub-directory holding `metadata.json` is used.

#![deny(unsafe_code)]

mod metadata;

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use metadata::{AssetRef, BundleMetadata, PlatformFiles};

/// Unpacking or parsing failure.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error while unpacking: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ZIP archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("metadata.json not found in the bundle")]
    MissingMetadata,

    #[error("Malformed {file}: {source}")]
    MalformedJson {
        file: &'static str,
        source: serde_json::Error,
    },
}

/// An extracted bundle, rooted where `metadata.json` lives.
#[derive(Debug)]
pub struct UnpackedBundle {
    /// Normalized root directory inside the extraction destination.
    pub root: PathBuf,
    pub metadata: BundleMetadata,
    /// The project's expo configuration, verbatim, when the export had one.
    pub expo_config: Option<serde_json::Value>,
}

/// Extract `zip_path` into `dest` and locate the build root.
pub fn unpack(zip_path: &Path, dest: &Path) -> Result<UnpackedBundle, BundleError> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest)?;
    archive.extract(dest)?;

    let root = normalize_root(dest)?;

    let metadata_path = root.join("metadata.json");
    if !metadata_path.is_file() {
        return Err(BundleError::MissingMetadata);
    }
    let metadata: BundleMetadata = serde_json::from_slice(&std::fs::read(&metadata_path)?)
        .map_err(|source| BundleError::MalformedJson {
            file: "metadata.json",
            source,
        })?;

    let expo_config_path = root.join("expoConfig.json");
    let expo_config = if expo_config_path.is_file() {
        let value = serde_json::from_slice(&std::fs::read(&expo_config_path)?).map_err(
            |source| BundleError::MalformedJson {
                file: "expoConfig.json",
                source,
            },
        )?;
        Some(value)
    } else {
        None
    };

    Ok(UnpackedBundle {
        root,
        metadata,
        expo_config,
    })
}

/// Apply the root heuristics: descend into a single wrapping directory,
/// then into `dist/` when `metadata.json` is still absent.
fn normalize_root(dest: &Path) -> Result<PathBuf, BundleError> {
    let mut root = dest.to_path_buf();

    let entries: Vec<PathBuf> = std::fs::read_dir(&root)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    if let [only] = entries.as_slice() {
        if only.is_dir() {
            root = only.clone();
        }
    }

    if !root.join("metadata.json").is_file() && root.join("dist/metadata.json").is_file() {
        root = root.join("dist");
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const METADATA: &str = r#"{
        "version": 0,
        "bundler": "metro",
        "fileMetadata": {
            "android": {
                "bundle": "bundles/android-a1b2c3.js",
                "assets": [{"path": "assets/4f2cab1", "ext": "png"}]
            }
        }
    }"#;

    fn write_zip(path: &Path, prefix: &str) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        writer
            .start_file(format!("{prefix}metadata.json"), options)
            .unwrap();
        writer.write_all(METADATA.as_bytes()).unwrap();
        writer
            .start_file(format!("{prefix}bundles/android-a1b2c3.js"), options)
            .unwrap();
        writer.write_all(b"var x = 1;").unwrap();
        writer
            .start_file(format!("{prefix}assets/4f2cab1"), options)
            .unwrap();
        writer.write_all(b"\x89PNG").unwrap();
        writer.finish().unwrap();
    }

    fn assert_normalized(bundle: &UnpackedBundle) {
        assert!(bundle.root.join("metadata.json").is_file());
        assert!(bundle.root.join("bundles/android-a1b2c3.js").is_file());
        assert!(bundle.root.join("assets/4f2cab1").is_file());

        let android = bundle.metadata.file_metadata.get("android").unwrap();
        assert_eq!(android.bundle, "bundles/android-a1b2c3.js");
        assert_eq!(android.assets.len(), 1);
        assert_eq!(android.assets[0].path, "assets/4f2cab1");
        assert_eq!(android.assets[0].ext, "png");
    }

    #[test]
    fn unpacks_flat_layout() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        write_zip(&zip_path, "");

        let bundle = unpack(&zip_path, &scratch.path().join("out")).unwrap();
        assert_normalized(&bundle);
    }

    #[test]
    fn unpacks_dist_layout() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        write_zip(&zip_path, "dist/");

        let bundle = unpack(&zip_path, &scratch.path().join("out")).unwrap();
        assert_normalized(&bundle);
    }

    #[test]
    fn unpacks_wrapping_directory_layout() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        write_zip(&zip_path, "build-xyz/");

        let bundle = unpack(&zip_path, &scratch.path().join("out")).unwrap();
        assert_normalized(&bundle);
    }

    #[test]
    fn all_layouts_produce_the_same_tree() {
        let scratch = tempdir().unwrap();
        let mut roots = Vec::new();
        for (index, prefix) in ["", "dist/", "build-xyz/"].iter().enumerate() {
            let zip_path = scratch.path().join(format!("build-{index}.zip"));
            write_zip(&zip_path, prefix);
            let bundle = unpack(&zip_path, &scratch.path().join(format!("out-{index}"))).unwrap();
            roots.push(bundle.root);
        }

        for root in &roots {
            let bundle_bytes = std::fs::read(root.join("bundles/android-a1b2c3.js")).unwrap();
            assert_eq!(bundle_bytes, b"var x = 1;");
        }
    }

    #[test]
    fn parses_expo_config_when_present() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
        let options = SimpleFileOptions::default();
        writer.start_file("metadata.json", options).unwrap();
        writer.write_all(METADATA.as_bytes()).unwrap();
        writer.start_file("expoConfig.json", options).unwrap();
        writer
            .write_all(br#"{"name": "demo", "slug": "demo", "sdkVersion": "52.0.0"}"#)
            .unwrap();
        writer.finish().unwrap();

        let bundle = unpack(&zip_path, &scratch.path().join("out")).unwrap();
        let config = bundle.expo_config.unwrap();
        assert_eq!(config["slug"], "demo");
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"not a bundle").unwrap();
        writer.finish().unwrap();

        let result = unpack(&zip_path, &scratch.path().join("out"));
        assert!(matches!(result, Err(BundleError::MissingMetadata)));
    }

    #[test]
    fn garbage_bytes_are_an_archive_error() {
        let scratch = tempdir().unwrap();
        let zip_path = scratch.path().join("build.zip");
        std::fs::write(&zip_path, b"definitely not a zip").unwrap();

        let result = unpack(&zip_path, &scratch.path().join("out"));
        assert!(matches!(result, Err(BundleError::Archive(_))));
    }
}
