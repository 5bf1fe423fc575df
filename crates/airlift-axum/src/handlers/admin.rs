//! The bearer-gated admin surface.
//!
//! CRUD over projects, updates, and API keys, plus stats aggregation and
//! rollback creation. Deletes schedule best-effort CDN folder sweeps that
//! never block the response.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use airlift_core::domain::{
    ApiKey, IssuedApiKey, NewUpdate, Platform, Project, StatsSummary, Update, UpdateFilter,
    UpdateMetadata, UpdatePatch,
};
use airlift_core::hashing::random_update_id;
use airlift_core::ports::ObjectStore;

use crate::auth::require_admin;
use crate::error::HttpError;
use crate::state::AppState;

/// Default page size for update listings.
const DEFAULT_LIMIT: i64 = 50;

// ─────────────────────────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub slug: String,
    pub name: Option<String>,
}

/// List all projects, newest first.
pub async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Project>>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    Ok(Json(stores.projects.list().await?))
}

/// Create (or return the existing) project for a slug.
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), HttpError> {
    require_admin(&state, &headers)?;
    if request.slug.is_empty() {
        return Err(HttpError::BadRequest("slug is required".to_string()));
    }
    let stores = state.stores()?;
    let name = request.name.unwrap_or_else(|| request.slug.clone());
    let project = stores.projects.ensure(&request.slug, &name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Fetch one project by slug.
pub async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Project>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    let project = stores
        .projects
        .get(&slug)
        .await?
        .ok_or_else(|| HttpError::NotFound(format!("Project '{slug}'")))?;
    Ok(Json(project))
}

/// Delete a project, cascading to its updates and their CDN folders.
pub async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Value>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;

    // Capture the CDN folders before the records disappear
    let filter = UpdateFilter {
        project_slug: Some(slug.clone()),
        ..UpdateFilter::default()
    };
    let (updates, _) = stores.updates.list(&filter, i64::MAX, 0).await?;
    let folders: Vec<String> = updates.iter().map(cdn_folder).collect();

    let deleted = stores.updates.delete_by_project(&slug).await?;
    stores.projects.delete(&slug).await?;

    if let Some(object_store) = &state.object_store {
        sweep_folders(object_store.clone(), folders);
    }

    Ok(Json(json!({"deleted": deleted})))
}

// ─────────────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateListQuery {
    project: Option<String>,
    channel: Option<String>,
    platform: Option<String>,
    #[serde(rename = "runtimeVersion")]
    runtime_version: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UpdateListResponse {
    pub updates: Vec<Update>,
    pub total: i64,
}

/// List updates newest-first with optional filters and paging.
pub async fn list_updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UpdateListQuery>,
) -> Result<Json<UpdateListResponse>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;

    let platform = query
        .platform
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(|text| {
            Platform::parse(text)
                .ok_or_else(|| HttpError::BadRequest(format!("Invalid platform '{text}'")))
        })
        .transpose()?;

    let filter = UpdateFilter {
        project_slug: query.project.filter(|text| !text.is_empty()),
        runtime_version: query.runtime_version.filter(|text| !text.is_empty()),
        channel: query.channel.filter(|text| !text.is_empty()),
        platform,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let offset = query.offset.unwrap_or(0).max(0);

    let (updates, total) = stores.updates.list(&filter, limit, offset).await?;
    Ok(Json(UpdateListResponse { updates, total }))
}

/// Manual registration of an update record (no bundle upload involved).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUpdateRequest {
    pub update_id: Option<String>,
    pub project_slug: String,
    pub runtime_version: String,
    pub channel: Option<String>,
    pub platform: Option<String>,
    pub rollout_percentage: Option<i64>,
    pub metadata: Option<UpdateMetadata>,
}

/// Register an update record directly.
pub async fn register_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterUpdateRequest>,
) -> Result<(StatusCode, Json<Update>), HttpError> {
    require_admin(&state, &headers)?;
    if request.project_slug.is_empty() {
        return Err(HttpError::BadRequest("projectSlug is required".to_string()));
    }
    if request.runtime_version.is_empty() {
        return Err(HttpError::BadRequest(
            "runtimeVersion is required".to_string(),
        ));
    }
    let platform = match request.platform.as_deref() {
        None | Some("") => Platform::All,
        Some(text) => Platform::parse(text)
            .ok_or_else(|| HttpError::BadRequest(format!("Invalid platform '{text}'")))?,
    };

    let stores = state.stores()?;
    stores
        .projects
        .ensure(&request.project_slug, &request.project_slug)
        .await?;

    let created = stores
        .updates
        .create(NewUpdate {
            update_id: request
                .update_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(random_update_id),
            project_slug: request.project_slug,
            runtime_version: request.runtime_version,
            channel: request.channel,
            platform,
            rollout_percentage: request.rollout_percentage,
            is_rollback: false,
            bundle_path: None,
            metadata: request.metadata,
            created_at: None,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Resolve `{id}` as the database id or, failing that, the client-visible
/// update identifier.
async fn resolve_update(
    stores: &airlift_core::ports::Stores,
    id: &str,
) -> Result<Update, HttpError> {
    if let Ok(pk) = id.parse::<i64>() {
        if let Some(update) = stores.updates.find_by_id(pk).await? {
            return Ok(update);
        }
    }
    stores
        .updates
        .find_by_update_id(id)
        .await?
        .ok_or_else(|| HttpError::NotFound(format!("Update {id}")))
}

/// Patch accepts only `isActive` and `rolloutPercentage`; anything else in
/// the body is ignored.
pub async fn patch_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<UpdatePatch>,
) -> Result<Json<Update>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    let update = resolve_update(stores, &id).await?;
    Ok(Json(stores.updates.patch(update.id, patch).await?))
}

/// Delete one update; its CDN folder is swept in the background.
pub async fn delete_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;

    let update = resolve_update(stores, &id).await?;
    stores.updates.delete(update.id).await?;

    if let Some(object_store) = &state.object_store {
        sweep_folders(object_store.clone(), vec![cdn_folder(&update)]);
    }

    Ok(Json(json!({"deleted": true})))
}

/// Body of `POST /api/admin/updates/{id}/rollback`; the referenced update
/// supplies defaults for anything omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub runtime_version: Option<String>,
    pub channel: Option<String>,
}

/// Insert a rollback directive record scoped like the referenced update.
pub async fn create_rollback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RollbackRequest>,
) -> Result<(StatusCode, Json<Update>), HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;

    let source = resolve_update(stores, &id).await?;

    let created = stores
        .updates
        .create(NewUpdate::rollback(
            random_update_id(),
            source.project_slug,
            request
                .runtime_version
                .filter(|text| !text.is_empty())
                .unwrap_or(source.runtime_version),
            Some(
                request
                    .channel
                    .filter(|text| !text.is_empty())
                    .unwrap_or(source.channel),
            ),
            source.platform,
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats & API keys
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregated download statistics.
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsSummary>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    Ok(Json(stores.analytics.summary().await?))
}

/// List API keys (hashes never leave the store).
pub async fn list_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiKey>>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    Ok(Json(stores.api_keys.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub scopes: Option<Vec<String>>,
}

/// Mint a key; the plaintext appears in this response and nowhere else.
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<IssuedApiKey>), HttpError> {
    require_admin(&state, &headers)?;
    if request.name.is_empty() {
        return Err(HttpError::BadRequest("name is required".to_string()));
    }
    let stores = state.stores()?;
    let issued = stores
        .api_keys
        .create(&request.name, request.scopes.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Revoke a key.
pub async fn delete_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, HttpError> {
    require_admin(&state, &headers)?;
    let stores = state.stores()?;
    stores.api_keys.delete(id).await?;
    Ok(Json(json!({"deleted": true})))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// The CDN folder an ingested update was uploaded under.
fn cdn_folder(update: &Update) -> String {
    format!("updates/{}/{}", update.runtime_version, update.update_id)
}

/// Best-effort background CDN cleanup; failures are logged and ignored.
fn sweep_folders(object_store: Arc<dyn ObjectStore>, folders: Vec<String>) {
    tokio::spawn(async move {
        for folder in folders {
            if let Err(e) = object_store.delete_folder(&folder).await {
                tracing::warn!("CDN sweep of {folder} failed: {e}");
            }
        }
    });
}
