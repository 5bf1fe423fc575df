//! Cloudinary implementation of the airlift object-store port.
//!
//! Uploads go through the signed upload API, one request per file, with the
//! resource type split Cloudinary requires: `image` for image MIME types,
//! `raw` for everything else. Folder deletion sweeps both resource types by
//! prefix before removing the folder itself.
//!
//! Cancellation: dropping a request future aborts the underlying transfer,
//! so an aborted ingestion request stops uploading mid-tree.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use airlift_core::ports::{ObjectStore, ObjectStoreError};
use airlift_core::utils::content_type::is_image_ext;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Connection settings for one Cloudinary account.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// Build a config when all three values are present and non-empty.
    #[must_use]
    pub fn from_parts(
        cloud_name: Option<String>,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Option<Self> {
        match (cloud_name, api_key, api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret))
                if !cloud_name.is_empty() && !api_key.is_empty() && !api_secret.is_empty() =>
            {
                Some(Self {
                    cloud_name,
                    api_key,
                    api_secret,
                })
            }
            _ => None,
        }
    }
}

/// Successful upload reply; everything except the secure URL is ignored.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Cloudinary-backed object store.
pub struct CloudinaryStore {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    #[must_use]
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Resource type for a remote path: `image` for image MIME, `raw` otherwise.
    fn resource_type(remote_path: &str) -> &'static str {
        let ext = remote_path.rsplit_once('.').map_or("", |(_, ext)| ext);
        if is_image_ext(ext) { "image" } else { "raw" }
    }

    /// Hex SHA-1 over the alphabetically-sorted parameter string plus the
    /// API secret, per Cloudinary's signed-upload contract.
    fn signature(params: &mut Vec<(String, String)>, api_secret: &str) -> String {
        params.sort();
        let joined = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{:x}", Sha1::digest(format!("{joined}{api_secret}").as_bytes()))
    }

    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        remote_path: &str,
    ) -> Result<String, ObjectStoreError> {
        let resource_type = Self::resource_type(remote_path);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
            .to_string();

        let mut signed_params = vec![
            ("public_id".to_string(), remote_path.to_string()),
            ("timestamp".to_string(), timestamp.clone()),
        ];
        let signature = Self::signature(&mut signed_params, &self.config.api_secret);

        let file_name = remote_path
            .rsplit('/')
            .next()
            .unwrap_or(remote_path)
            .to_string();
        let form = reqwest::multipart::Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", remote_path.to_string())
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!(
            "{API_BASE}/{}/{resource_type}/upload",
            self.config.cloud_name
        );
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Rejected(format!(
                "upload of {remote_path} returned {status}: {body}"
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ObjectStoreError::Rejected(e.to_string()))?;
        Ok(parsed.secure_url)
    }

    async fn delete_by_prefix(
        &self,
        resource_type: &str,
        folder: &str,
    ) -> Result<(), ObjectStoreError> {
        let url = format!(
            "{API_BASE}/{}/resources/{resource_type}/upload",
            self.config.cloud_name
        );
        let response = self
            .http
            .delete(&url)
            .query(&[("prefix", format!("{folder}/"))])
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(ObjectStoreError::Rejected(format!(
                "prefix delete of {folder} ({resource_type}) returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<String, ObjectStoreError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| ObjectStoreError::Io(format!("{}: {e}", local_path.display())))?;
        self.upload_bytes(bytes, remote_path).await
    }

    async fn upload_tree(
        &self,
        root: &Path,
        folder: &str,
    ) -> Result<HashMap<String, String>, ObjectStoreError> {
        let files =
            collect_files(root).map_err(|e| ObjectStoreError::Io(e.to_string()))?;

        let mut urls = HashMap::with_capacity(files.len());
        for path in files {
            let relative = relative_slash_path(root, &path);
            let url = self
                .upload_file(&path, &format!("{folder}/{relative}"))
                .await?;
            urls.insert(relative, url);
        }
        Ok(urls)
    }

    async fn delete_folder(&self, folder: &str) -> Result<(), ObjectStoreError> {
        for resource_type in ["image", "raw"] {
            self.delete_by_prefix(resource_type, folder).await?;
        }

        let url = format!("{API_BASE}/{}/folders/{folder}", self.config.cloud_name);
        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(ObjectStoreError::Rejected(format!(
                "folder delete of {folder} returned {}",
                response.status()
            )))
        }
    }
}

/// Every regular file under `root`, depth-first.
fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Path of `file` relative to `root` with forward-slash separators.
fn relative_slash_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}
