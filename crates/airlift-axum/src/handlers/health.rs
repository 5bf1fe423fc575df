//! The ungated health endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match &state.stores {
        None => "not configured",
        Some(stores) => match stores.updates.ping().await {
            Ok(()) => "ok",
            Err(_) => "error",
        },
    };
    let cloudinary = if state.object_store.is_some() {
        "ok"
    } else {
        "not configured"
    };
    let signing = if state.signer.is_some() {
        "ok"
    } else {
        "not configured"
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": database,
            "cloudinary": cloudinary,
            "signing": signing,
        }
    }))
}
