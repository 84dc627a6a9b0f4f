pub mod items;
pub mod plugins;

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use modhost_db::AppState;

/// Extract the plugin manager from type-erased application state.
///
/// Returns `None` if the manager was not installed into the state
/// (possible in tests exercising only the CRUD surface).
pub fn get_plugin_manager(state: &AppState) -> Option<Arc<modhost_plugin::PluginManager>> {
    state.plugins.as_ref().and_then(|any| {
        any.clone()
            .downcast::<modhost_plugin::PluginManager>()
            .ok()
    })
}

/// GET /healthz — liveness plus a database round-trip.
pub async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match modhost_db::ping(&state.db).await {
        Ok(()) => Ok(Json(
            serde_json::json!({ "status": "ok", "database": "ok" }),
        )),
        Err(e) => {
            tracing::error!("health check failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Database connection failed" })),
            ))
        }
    }
}
