//! The manifest negotiation endpoint.
//!
//! Implements the Expo update protocol state machine: a poll is answered
//! with a full manifest, a `rollBackToEmbedded` directive, or a
//! `noUpdateAvailable` outcome whose shape depends on the protocol version
//! (a multipart directive on protocol 1, a plain 404 on protocol 0).

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use airlift_core::domain::{Platform, Update};
use airlift_core::timefmt;
use airlift_core::utils::content_type::content_type_for_ext;

use crate::error::HttpError;
use crate::multipart::MultipartBody;
use crate::state::AppState;

/// Query fallbacks for clients that cannot set headers.
#[derive(Debug, Deserialize)]
pub struct ManifestQuery {
    platform: Option<String>,
    #[serde(rename = "runtime-version")]
    runtime_version: Option<String>,
}

/// What the state machine decided to send.
enum Outcome {
    NoUpdate,
    RollBack(Update),
    Manifest(Update),
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Legacy unscoped alias: stays routed, always errors on the missing slug.
pub async fn unscoped_manifest() -> HttpError {
    HttpError::BadRequest("Project slug is required".to_string())
}

/// `GET /api/{projectSlug}/manifest`
pub async fn serve_manifest(
    State(state): State<AppState>,
    Path(project_slug): Path<String>,
    Query(query): Query<ManifestQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    if project_slug.is_empty() {
        return Err(HttpError::BadRequest("Project slug is required".to_string()));
    }

    let protocol_version: u8 = match header_str(&headers, "expo-protocol-version") {
        Some("1") => 1,
        _ => 0,
    };

    let platform_text = header_str(&headers, "expo-platform")
        .map(str::to_string)
        .or(query.platform)
        .unwrap_or_default();
    let platform = match Platform::parse(&platform_text) {
        Some(platform @ (Platform::Android | Platform::Ios)) => platform,
        _ => {
            return Err(HttpError::BadRequest(
                "Platform must be 'ios' or 'android'".to_string(),
            ));
        }
    };

    let runtime_version = header_str(&headers, "expo-runtime-version")
        .map(str::to_string)
        .or(query.runtime_version)
        .unwrap_or_default();
    if runtime_version.is_empty() {
        return Err(HttpError::BadRequest(
            "Runtime version is required".to_string(),
        ));
    }

    let channel = header_str(&headers, "expo-channel-name").unwrap_or("production");
    let current_update_id = header_str(&headers, "expo-current-update-id").unwrap_or("");
    let embedded_update_id = header_str(&headers, "expo-embedded-update-id").unwrap_or("");
    let expect_signature = header_str(&headers, "expo-expect-signature")
        .is_some_and(|value| !value.is_empty());

    let candidate = match &state.stores {
        Some(stores) => {
            stores
                .updates
                .find_latest(&project_slug, &runtime_version, channel, platform)
                .await?
        }
        None => None,
    };

    let outcome = match candidate {
        None => Outcome::NoUpdate,
        Some(update) if update.is_rollback => {
            // A client still on its embedded build has nothing to roll back
            if current_update_id == embedded_update_id {
                Outcome::NoUpdate
            } else {
                Outcome::RollBack(update)
            }
        }
        Some(update) => {
            if protocol_version == 1 && update.update_id == current_update_id {
                Outcome::NoUpdate
            } else {
                // Percentage gate, keyed by the per-install client id when
                // the device sends one
                let fingerprint = header_str(&headers, "eas-client-id")
                    .filter(|value| !value.is_empty())
                    .unwrap_or(current_update_id);
                if state
                    .rollout
                    .should_serve(update.rollout_percentage, fingerprint)
                {
                    Outcome::Manifest(update)
                } else {
                    Outcome::NoUpdate
                }
            }
        }
    };

    match outcome {
        Outcome::NoUpdate => Ok(no_update_response(protocol_version, expect_signature, &state)),
        Outcome::RollBack(update) => {
            let directive = json!({
                "type": "rollBackToEmbedded",
                "parameters": {
                    "commitTime": timefmt::format_utc_millis(&update.created_at),
                }
            });
            Ok(protocol_response(
                protocol_version,
                "directive",
                &directive,
                expect_signature,
                &state,
            ))
        }
        Outcome::Manifest(update) => {
            let manifest = build_manifest(&state, &update, platform, &runtime_version)?;
            Ok(protocol_response(
                protocol_version,
                "manifest",
                &manifest,
                expect_signature,
                &state,
            ))
        }
    }
}

/// Protocol 0 answers "no update" with a plain 404; protocol 1 with a
/// multipart directive.
fn no_update_response(protocol_version: u8, expect_signature: bool, state: &AppState) -> Response {
    if protocol_version == 0 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No update available"})),
        )
            .into_response();
    }
    protocol_response(
        protocol_version,
        "directive",
        &json!({"type": "noUpdateAvailable"}),
        expect_signature,
        state,
    )
}

/// Frame one JSON part as the protocol's multipart/mixed reply.
fn protocol_response(
    protocol_version: u8,
    part_name: &str,
    body: &Value,
    expect_signature: bool,
    state: &AppState,
) -> Response {
    let body_bytes = serde_json::to_vec(body).unwrap_or_default();

    let signature = if expect_signature {
        state
            .signer
            .as_ref()
            .map(|signer| signer.signature_header(&body_bytes))
    } else {
        None
    };

    let multipart = MultipartBody::single_json_part(part_name, &body_bytes, signature.as_deref());
    let content_type = multipart.content_type();

    (
        StatusCode::OK,
        [
            ("expo-protocol-version", protocol_version.to_string()),
            ("expo-sfv-version", "0".to_string()),
            (CACHE_CONTROL.as_str(), "private, max-age=0".to_string()),
            (CONTENT_TYPE.as_str(), content_type),
        ],
        multipart.into_bytes(),
    )
        .into_response()
}

/// Assemble the full manifest JSON for one update and platform.
fn build_manifest(
    state: &AppState,
    update: &Update,
    platform: Platform,
    runtime_version: &str,
) -> Result<Value, HttpError> {
    let metadata = update
        .metadata
        .as_ref()
        .ok_or_else(|| HttpError::Internal("Update record has no metadata".to_string()))?;
    let build = metadata.platforms.get(platform.as_str()).ok_or_else(|| {
        HttpError::Internal(format!(
            "Update {} has no {platform} build",
            update.update_id
        ))
    })?;

    let base_url = state.config.base_url();

    let launch_asset = json!({
        "hash": build.bundle_hash,
        "key": build.bundle_key,
        "fileExtension": ".bundle",
        "contentType": "application/javascript",
        "url": asset_url(
            &base_url,
            &build.bundle_path,
            runtime_version,
            platform,
            &build.bundle_url,
            Some(update.id),
        ),
    });

    let assets: Vec<Value> = build
        .assets
        .iter()
        .map(|asset| {
            json!({
                "hash": asset.hash,
                "key": asset.key,
                "fileExtension": format!(".{}", asset.ext),
                "contentType": content_type_for_ext(&asset.ext),
                "url": asset_url(
                    &base_url,
                    &asset.path,
                    runtime_version,
                    platform,
                    &asset.url,
                    None,
                ),
            })
        })
        .collect();

    Ok(json!({
        "id": update.update_id,
        "createdAt": timefmt::format_utc_millis(&update.created_at),
        "runtimeVersion": update.runtime_version,
        "assets": assets,
        "launchAsset": launch_asset,
        "metadata": {},
        "extra": {
            "expoClient": metadata.expo_config.clone().unwrap_or(Value::Null),
        },
    }))
}

/// Build an asset URL pointing at this server's asset endpoint, so download
/// accounting and access control stay central even when a CDN URL exists.
fn asset_url(
    base_url: &str,
    relative_path: &str,
    runtime_version: &str,
    platform: Platform,
    redirect: &str,
    launch_update_pk: Option<i64>,
) -> String {
    let mut url = format!(
        "{base_url}/api/assets?asset={}&runtimeVersion={}&platform={}",
        urlencoding::encode(relative_path),
        urlencoding::encode(runtime_version),
        platform.as_str(),
    );
    if !redirect.is_empty() {
        url.push_str(&format!("&redirect={}", urlencoding::encode(redirect)));
    }
    if let Some(update_pk) = launch_update_pk {
        url.push_str("&isLaunchAsset=true");
        url.push_str(&format!("&updateId={update_pk}"));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_url_encodes_path_and_orders_params() {
        let url = asset_url(
            "https://ota.example.com",
            "bundles/android-a.js",
            "1",
            Platform::Android,
            "",
            Some(7),
        );
        assert_eq!(
            url,
            "https://ota.example.com/api/assets?asset=bundles%2Fandroid-a.js&runtimeVersion=1&platform=android&isLaunchAsset=true&updateId=7"
        );
    }

    #[test]
    fn asset_url_places_redirect_before_launch_marker() {
        let url = asset_url(
            "http://localhost:3000",
            "assets/4f2cab1",
            "2.0",
            Platform::Ios,
            "https://cdn.example.com/x",
            None,
        );
        assert_eq!(
            url,
            "http://localhost:3000/api/assets?asset=assets%2F4f2cab1&runtimeVersion=2.0&platform=ios&redirect=https%3A%2F%2Fcdn.example.com%2Fx"
        );
    }
}
