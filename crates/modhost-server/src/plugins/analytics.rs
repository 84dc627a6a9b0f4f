//! Analytics plugin: read-only reporting over the core `items` table.
//!
//! Resolves the shared database handle through the service registry
//! during `init` and captures it in its route-group, so the plugin never
//! touches application state directly.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Json, Router};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use modhost_db::entities::item;
use modhost_db::AppState;
use modhost_plugin::{HostContext, Module, ModuleError, ServiceRegistry};

pub struct AnalyticsPlugin {
    router: Option<Router<Arc<AppState>>>,
}

impl AnalyticsPlugin {
    pub fn new() -> Self {
        Self { router: None }
    }
}

impl Default for AnalyticsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for AnalyticsPlugin {
    fn name(&self) -> &str {
        "analytics"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn init(
        &mut self,
        _host: &HostContext,
        registry: &ServiceRegistry,
    ) -> Result<(), ModuleError> {
        let db = super::db_from_registry(registry).await?;
        self.router = Some(Router::new().route(
            "/count",
            get(move || {
                let db = db.clone();
                async move { count_items(&db).await }
            }),
        ));
        Ok(())
    }

    async fn start(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn router(&self) -> Option<Router<Arc<AppState>>> {
        self.router.clone()
    }
}

/// GET /plugins/analytics/count
async fn count_items(
    db: &DatabaseConnection,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let count = item::Entity::find().count(db).await.map_err(|e| {
        tracing::error!("analytics count query failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("DB error: {e}") })),
        )
    })?;

    Ok(Json(serde_json::json!({ "items_count": count })))
}
