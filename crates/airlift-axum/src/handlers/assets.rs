//! The content-addressed asset endpoint.
//!
//! Serves individual assets either by 302-redirecting to their CDN URL or
//! by streaming bytes from the local updates directory. Launch-asset
//! fetches are counted in a detached task; the reply never waits on the
//! counter write.

use std::path::{Component, Path};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use airlift_core::domain::DownloadEvent;
use airlift_core::ports::Stores;
use airlift_core::utils::content_type::content_type_for_path;

use crate::error::HttpError;
use crate::state::AppState;

/// Immutable far-future caching for content-addressed bytes.
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    asset: Option<String>,
    platform: Option<String>,
    #[serde(rename = "runtimeVersion")]
    runtime_version: Option<String>,
    redirect: Option<String>,
    #[serde(rename = "updateId")]
    update_id: Option<i64>,
    #[serde(rename = "isLaunchAsset")]
    is_launch_asset: Option<String>,
}

/// `GET /api/assets`
pub async fn serve_asset(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> Result<Response, HttpError> {
    let is_launch_asset = query.is_launch_asset.as_deref() == Some("true");
    let platform = query.platform.clone().unwrap_or_default();

    if let Some(redirect) = &query.redirect {
        if is_launch_asset {
            if let (Some(update_pk), Some(stores)) = (query.update_id, &state.stores) {
                record_download(stores.clone(), update_pk, platform);
            }
        }
        // Never block the redirect on the counter write
        return Ok((StatusCode::FOUND, [(LOCATION.as_str(), redirect.clone())]).into_response());
    }

    let asset = query.asset.as_deref().unwrap_or("");
    let runtime_version = query.runtime_version.as_deref().unwrap_or("");
    if asset.is_empty() || platform.is_empty() || runtime_version.is_empty() {
        return Err(HttpError::BadRequest(
            "asset, platform, and runtimeVersion are required".to_string(),
        ));
    }

    if !is_clean_relative(Path::new(asset)) {
        return Err(HttpError::BadRequest("Invalid asset path".to_string()));
    }

    let full_path = state.config.updates_dir.join(asset);
    let file = tokio::fs::File::open(&full_path)
        .await
        .map_err(|_| HttpError::NotFound(format!("Asset not found: {asset}")))?;

    if is_launch_asset {
        if let (Some(update_pk), Some(stores)) = (query.update_id, &state.stores) {
            record_download(stores.clone(), update_pk, platform);
        }
    }

    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE.as_str(), content_type_for_path(asset).to_string()),
            (CACHE_CONTROL.as_str(), IMMUTABLE_CACHE.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Relative path without traversal or root components.
fn is_clean_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Detached download accounting: bump the record's counter and append to
/// the download log. All errors are swallowed.
fn record_download(stores: Stores, update_pk: i64, platform: String) {
    tokio::spawn(async move {
        if let Err(e) = stores.updates.increment_downloads(update_pk).await {
            tracing::debug!("download counter increment for {update_pk} failed: {e}");
        }
        if let Err(e) = stores
            .analytics
            .log(DownloadEvent::success_now(update_pk, platform))
            .await
        {
            tracing::debug!("download log append for {update_pk} failed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_components_are_rejected() {
        assert!(is_clean_relative(Path::new("bundles/android-a.js")));
        assert!(is_clean_relative(Path::new("./assets/4f2cab1")));
        assert!(!is_clean_relative(Path::new("../etc/passwd")));
        assert!(!is_clean_relative(Path::new("bundles/../../etc/passwd")));
        assert!(!is_clean_relative(Path::new("/etc/passwd")));
    }
}
