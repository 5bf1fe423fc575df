//! The update ingestion pipeline.
//!
//! A publisher POSTs a multipart form with the exported ZIP. The pipeline
//! persists the archive to scratch space, unpacks and normalizes it, hashes
//! every listed file into `(key, hash)` pairs, ships the tree to the object
//! store (or into the local updates directory when none is configured), and
//! inserts the update record. Failures surface before the record exists;
//! a CDN failure after unpacking falls back to local serving instead of
//! rolling the insert back.

use std::collections::BTreeMap;
use std::path::Path;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};

use airlift_core::domain::{
    AssetFile, NewUpdate, Platform, PlatformBundle, Update, UpdateMetadata,
};
use airlift_core::hashing::{random_update_id, sha256_b64url, sha256_hex};

use crate::auth::require_publisher;
use crate::error::HttpError;
use crate::state::AppState;

/// Parsed form fields.
#[derive(Default)]
struct UploadForm {
    project_slug: Option<String>,
    update_id: Option<String>,
    runtime_version: Option<String>,
    channel: Option<String>,
    platform: Option<String>,
    rollout_percentage: Option<String>,
    bundle: Option<axum::body::Bytes>,
}

/// `POST /api/upload`
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Update>), HttpError> {
    require_publisher(&state, &headers).await?;

    let form = parse_form(multipart).await?;

    let project_slug = required(form.project_slug, "projectSlug")?;
    let runtime_version = required(form.runtime_version, "runtimeVersion")?;
    let zip_bytes = form
        .bundle
        .ok_or_else(|| HttpError::BadRequest("bundle file field is required".to_string()))?;

    let platform = match form.platform.as_deref() {
        None | Some("") => Platform::All,
        Some(text) => Platform::parse(text)
            .ok_or_else(|| HttpError::BadRequest(format!("Invalid platform '{text}'")))?,
    };
    let rollout_percentage = form
        .rollout_percentage
        .filter(|text| !text.is_empty())
        .map(|text| {
            text.parse::<i64>()
                .map_err(|_| HttpError::BadRequest(format!("Invalid rolloutPercentage '{text}'")))
        })
        .transpose()?;
    let update_id = form
        .update_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(random_update_id);
    let channel = form.channel.filter(|channel| !channel.is_empty());

    let stores = state.stores().map_err(HttpError::from)?.clone();

    // Scratch space lives until the response is built, then drops away
    let scratch = tempfile::tempdir()
        .map_err(|e| HttpError::Internal(format!("Scratch dir creation failed: {e}")))?;
    let zip_path = scratch.path().join("bundle.zip");
    std::fs::write(&zip_path, &zip_bytes)
        .map_err(|e| HttpError::Internal(format!("Bundle spill failed: {e}")))?;

    let unpack_dest = scratch.path().join("unpacked");
    let bundle = {
        let zip_path = zip_path.clone();
        let unpack_dest = unpack_dest.clone();
        tokio::task::spawn_blocking(move || airlift_bundle::unpack(&zip_path, &unpack_dest))
            .await
            .map_err(|e| HttpError::Internal(format!("Unpack task failed: {e}")))??
    };

    stores
        .projects
        .ensure(&project_slug, &project_slug)
        .await?;

    let mut metadata = hash_bundle_files(&bundle)?;

    // Ship the tree to the CDN, or fall back to the local updates directory
    let mut bundle_path = None;
    let mut uploaded = false;
    if let Some(object_store) = &state.object_store {
        let folder = format!("updates/{runtime_version}/{update_id}");
        match object_store.upload_tree(&bundle.root, &folder).await {
            Ok(urls) => {
                for build in metadata.platforms.values_mut() {
                    build.bundle_url = urls
                        .get(&slashed(&build.bundle_path))
                        .cloned()
                        .unwrap_or_default();
                    for asset in &mut build.assets {
                        asset.url = urls.get(&slashed(&asset.path)).cloned().unwrap_or_default();
                    }
                }
                uploaded = true;
            }
            Err(e) => {
                tracing::warn!("CDN upload for {update_id} failed, serving locally: {e}");
            }
        }
    }
    if !uploaded {
        copy_tree(&bundle.root, &state.config.updates_dir)
            .map_err(|e| HttpError::Internal(format!("Local persist failed: {e}")))?;
        bundle_path = Some(state.config.updates_dir.clone());
    }

    let created = stores
        .updates
        .create(NewUpdate {
            update_id,
            project_slug,
            runtime_version,
            channel,
            platform,
            rollout_percentage,
            is_rollback: false,
            bundle_path,
            metadata: Some(metadata),
            created_at: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn parse_form(mut multipart: Multipart) -> Result<UploadForm, HttpError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bundle" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::BadRequest(format!("Unreadable bundle field: {e}")))?;
                form.bundle = Some(bytes);
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::BadRequest(format!("Unreadable field {name}: {e}")))?;
                match name.as_str() {
                    "projectSlug" => form.project_slug = Some(text),
                    "updateId" => form.update_id = Some(text),
                    "runtimeVersion" => form.runtime_version = Some(text),
                    "channel" => form.channel = Some(text),
                    "platform" => form.platform = Some(text),
                    "rolloutPercentage" => form.rollout_percentage = Some(text),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

fn required(value: Option<String>, field: &str) -> Result<String, HttpError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| HttpError::BadRequest(format!("{field} is required")))
}

/// Read and hash every file `metadata.json` lists. A listed file missing
/// from disk is fatal for the whole ingestion.
fn hash_bundle_files(bundle: &airlift_bundle::UnpackedBundle) -> Result<UpdateMetadata, HttpError> {
    let mut platforms = BTreeMap::new();
    for (platform_key, files) in &bundle.metadata.file_metadata {
        let bundle_bytes = read_listed(&bundle.root, &files.bundle)?;
        let mut assets = Vec::with_capacity(files.assets.len());
        for asset in &files.assets {
            let bytes = read_listed(&bundle.root, &asset.path)?;
            assets.push(AssetFile {
                path: slashed(&asset.path),
                ext: asset.ext.clone(),
                key: sha256_hex(&bytes)[..32].to_string(),
                hash: sha256_b64url(&bytes),
                url: String::new(),
            });
        }
        platforms.insert(
            platform_key.clone(),
            PlatformBundle {
                bundle_path: slashed(&files.bundle),
                bundle_key: sha256_hex(&bundle_bytes)[..32].to_string(),
                bundle_hash: sha256_b64url(&bundle_bytes),
                bundle_url: String::new(),
                assets,
            },
        );
    }

    Ok(UpdateMetadata {
        platforms,
        expo_config: bundle.expo_config.clone(),
    })
}

fn read_listed(root: &Path, relative: &str) -> Result<Vec<u8>, HttpError> {
    std::fs::read(root.join(relative))
        .map_err(|e| HttpError::Internal(format!("Listed file {relative} unreadable: {e}")))
}

/// Forward-slash normalization for metadata paths and upload-map keys.
fn slashed(path: &str) -> String {
    path.replace('\\', "/")
}

/// Merge-copy the unpacked tree into the local updates directory. Paths are
/// content-addressed, so collisions across updates carry identical bytes.
fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    let mut pending = vec![src.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(src).unwrap_or(&path);
                let target = dest.join(relative);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&path, &target)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copy_tree_merges_nested_files() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("bundles")).unwrap();
        std::fs::write(src.path().join("bundles/a.js"), b"x").unwrap();
        std::fs::write(src.path().join("metadata.json"), b"{}").unwrap();

        copy_tree(src.path(), dest.path()).unwrap();
        assert_eq!(
            std::fs::read(dest.path().join("bundles/a.js")).unwrap(),
            b"x"
        );
        assert!(dest.path().join("metadata.json").is_file());
    }

    #[test]
    fn slashed_normalizes_backslashes() {
        assert_eq!(slashed("bundles\\android-a.js"), "bundles/android-a.js");
        assert_eq!(slashed("assets/4f2cab1"), "assets/4f2cab1");
    }
}
