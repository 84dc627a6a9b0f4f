//! Administrative endpoints over the plugin manager.
//!
//! Plugin-internal failures come back as a `failed` record with HTTP
//! 200; only "module not loaded" maps to 404.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use modhost_db::AppState;
use modhost_plugin::{ModuleError, ModuleRecord};

/// Admin route-group; the host nests this under `/plugins` next to the
/// mounted plugin route-groups.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_plugins))
        .route("/load/{name}", post(load_plugin))
        .route("/start/{name}", post(start_plugin))
        .route("/stop/{name}", post(stop_plugin))
}

fn manager_unavailable() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "Plugin manager not initialized" })),
    )
}

fn lifecycle_error(e: ModuleError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        ModuleError::NotLoaded(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

/// GET /plugins — list all module records.
pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ModuleRecord>>, (StatusCode, Json<serde_json::Value>)> {
    let manager = super::get_plugin_manager(&state).ok_or_else(manager_unavailable)?;
    Ok(Json(manager.list_states().await))
}

/// POST /plugins/load/:name — idempotent; failures surface as a
/// `failed` record, never as an HTTP error.
pub async fn load_plugin(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModuleRecord>, (StatusCode, Json<serde_json::Value>)> {
    let manager = super::get_plugin_manager(&state).ok_or_else(manager_unavailable)?;
    Ok(Json(manager.load(&name).await))
}

/// POST /plugins/start/:name — 404 if the name was never loaded.
pub async fn start_plugin(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModuleRecord>, (StatusCode, Json<serde_json::Value>)> {
    let manager = super::get_plugin_manager(&state).ok_or_else(manager_unavailable)?;
    let record = manager.start(&name).await.map_err(lifecycle_error)?;
    Ok(Json(record))
}

/// POST /plugins/stop/:name — 404 if the name was never loaded.
pub async fn stop_plugin(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModuleRecord>, (StatusCode, Json<serde_json::Value>)> {
    let manager = super::get_plugin_manager(&state).ok_or_else(manager_unavailable)?;
    let record = manager.stop(&name).await.map_err(lifecycle_error)?;
    Ok(Json(record))
}
