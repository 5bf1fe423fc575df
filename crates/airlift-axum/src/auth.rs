//! Bearer-token guards for the admin and publishing surfaces.
//!
//! Access control is opaque tokens only: the admin secret gates the admin
//! routes, and the publishing endpoint additionally accepts API keys. An
//! empty admin secret opens both surfaces (development mode).

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::error::HttpError;
use crate::state::AppState;

/// The token carried in `Authorization: Bearer <token>`, if any.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Admin routes: the token must equal the configured admin secret.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), HttpError> {
    if state.config.admin_secret.is_empty() {
        return Ok(());
    }
    match bearer_token(headers) {
        Some(token) if token == state.config.admin_secret => Ok(()),
        _ => Err(HttpError::Unauthorized(
            "Invalid or missing bearer token".to_string(),
        )),
    }
}

/// Publishing: the admin secret or a valid API key both pass.
pub async fn require_publisher(state: &AppState, headers: &HeaderMap) -> Result<(), HttpError> {
    if state.config.admin_secret.is_empty() {
        return Ok(());
    }
    let Some(token) = bearer_token(headers) else {
        return Err(HttpError::Unauthorized(
            "Invalid or missing bearer token".to_string(),
        ));
    };
    if token == state.config.admin_secret {
        return Ok(());
    }
    if let Some(stores) = &state.stores {
        if stores.api_keys.validate(token).await?.is_some() {
            return Ok(());
        }
    }
    Err(HttpError::Unauthorized(
        "Invalid or missing bearer token".to_string(),
    ))
}
