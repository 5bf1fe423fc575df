//! Route definitions and router construction.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bootstrap::ServerContext;
use crate::handlers::{admin, assets, health, ingest, manifest};
use crate::state::AppState;
use crate::cors;

/// Ingestion body cap.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Per-request timeouts: admin reads, admin mutations (CDN sweeps detach),
/// and ingestion uploads.
const READ_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const INGEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Create the main router with all API routes.
///
/// # Path Parameter Syntax
/// Axum 0.8 uses brace syntax for path parameters: `{slug}`, `{id}`
pub fn create_router(ctx: ServerContext) -> Router {
    let state: AppState = Arc::new(ctx);

    let read_timeout = TimeoutLayer::new(READ_TIMEOUT);
    let write_timeout = TimeoutLayer::new(WRITE_TIMEOUT);

    let admin = Router::new()
        .route(
            "/projects",
            get(admin::list_projects)
                .layer(read_timeout.clone())
                .merge(post(admin::create_project).layer(write_timeout.clone())),
        )
        .route(
            "/projects/{slug}",
            get(admin::get_project)
                .layer(read_timeout.clone())
                .merge(delete(admin::delete_project).layer(write_timeout.clone())),
        )
        .route(
            "/updates",
            get(admin::list_updates)
                .layer(read_timeout.clone())
                .merge(post(admin::register_update).layer(write_timeout.clone())),
        )
        .route(
            "/updates/{id}",
            patch(admin::patch_update)
                .delete(admin::delete_update)
                .layer(write_timeout.clone()),
        )
        .route(
            "/updates/{id}/rollback",
            post(admin::create_rollback).layer(write_timeout.clone()),
        )
        .route(
            "/keys",
            get(admin::list_keys)
                .layer(read_timeout.clone())
                .merge(post(admin::create_key).layer(write_timeout.clone())),
        )
        .route("/keys/{id}", delete(admin::delete_key).layer(write_timeout))
        .route("/stats", get(admin::stats).layer(read_timeout));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/{project_slug}/manifest", get(manifest::serve_manifest))
        // Legacy unscoped alias; kept routed, always errors on the missing slug
        .route("/manifest", get(manifest::unscoped_manifest))
        .route("/assets", get(assets::serve_asset))
        .route(
            "/upload",
            post(ingest::upload)
                .layer::<_, Infallible>(TimeoutLayer::new(INGEST_TIMEOUT))
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest("/admin", admin);

    Router::new()
        .nest("/api", api.with_state(state))
        .layer(middleware::from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
}
