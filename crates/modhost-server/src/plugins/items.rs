//! Items plugin: CRUD over its own `plugin_items` table, an
//! `X-Items-Plugin` response header installed app-wide, and an
//! `ItemsService` published into the registry for other modules.
//!
//! The table is created by `start()`, not by the core migrator, so a
//! deployment that never enables this plugin never carries the table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;

use modhost_db::entities::plugin_item;
use modhost_db::AppState;
use modhost_plugin::{
    HostContext, MiddlewareSpec, Module, ModuleError, ServiceHandle, ServiceRegistry,
};

pub struct ItemsPlugin {
    db: Option<DatabaseConnection>,
    services: HashMap<String, ServiceHandle>,
}

impl ItemsPlugin {
    pub fn new() -> Self {
        Self {
            db: None,
            services: HashMap::new(),
        }
    }
}

impl Default for ItemsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for ItemsPlugin {
    fn name(&self) -> &str {
        "items"
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
        self.services.insert(
            "plugin_items.service".to_string(),
            Arc::new(ItemsService::new(db.clone())) as ServiceHandle,
        );
        self.db = Some(db);
        Ok(())
    }

    /// Create the plugin-owned table once the database is reachable.
    async fn start(&self) -> Result<(), ModuleError> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| ModuleError::Lifecycle("items plugin not initialized".into()))?;
        db.execute_unprepared(
            r#"
            CREATE TABLE IF NOT EXISTS plugin_items (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn router(&self) -> Option<Router<Arc<AppState>>> {
        Some(
            Router::new()
                .route("/", get(list_plugin_items).post(create_plugin_item))
                .route(
                    "/{id}",
                    get(get_plugin_item)
                        .put(update_plugin_item)
                        .delete(delete_plugin_item),
                ),
        )
    }

    fn provides(&self) -> HashMap<String, ServiceHandle> {
        self.services.clone()
    }

    fn middlewares(&self) -> Vec<MiddlewareSpec> {
        vec![MiddlewareSpec::SetResponseHeader {
            name: "X-Items-Plugin".to_string(),
            value: "enabled".to_string(),
        }]
    }
}

/// Registry-published service other modules can downcast and call.
pub struct ItemsService {
    db: DatabaseConnection,
}

impl ItemsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create an item with only a name set and return its id.
    pub async fn create_default(&self, name: &str) -> Result<i32, ModuleError> {
        let entry = plugin_item::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().fixed_offset()),
            ..Default::default()
        };
        let model = entry.insert(&self.db).await?;
        Ok(model.id)
    }

    pub async fn count(&self) -> Result<u64, ModuleError> {
        Ok(plugin_item::Entity::find().count(&self.db).await?)
    }
}

// ─── Route handlers ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreatePluginItemRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePluginItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

fn db_error(e: sea_orm::DbErr) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!("plugin_items query failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": format!("DB error: {e}") })),
    )
}

fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Item not found" })),
    )
}

/// POST /plugins/items/
async fn create_plugin_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePluginItemRequest>,
) -> Result<Json<plugin_item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let entry = plugin_item::ActiveModel {
        name: Set(body.name),
        description: Set(body.description),
        created_at: Set(chrono::Utc::now().fixed_offset()),
        ..Default::default()
    };

    let model = entry.insert(&state.db).await.map_err(db_error)?;
    Ok(Json(model))
}

/// GET /plugins/items/?skip=0&limit=100
async fn list_plugin_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<plugin_item::Model>>, (StatusCode, Json<serde_json::Value>)> {
    let items = plugin_item::Entity::find()
        .order_by_asc(plugin_item::Column::Id)
        .offset(params.skip.unwrap_or(0))
        .limit(params.limit.unwrap_or(100))
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(items))
}

/// GET /plugins/items/:id
async fn get_plugin_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<plugin_item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let model = plugin_item::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    Ok(Json(model))
}

/// PUT /plugins/items/:id
async fn update_plugin_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdatePluginItemRequest>,
) -> Result<Json<plugin_item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let model = plugin_item::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    let mut active: plugin_item::ActiveModel = model.into();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(updated))
}

/// DELETE /plugins/items/:id
async fn delete_plugin_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let result = plugin_item::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found());
    }
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_header_middleware() {
        let plugin = ItemsPlugin::new();
        assert_eq!(
            plugin.middlewares(),
            vec![MiddlewareSpec::SetResponseHeader {
                name: "X-Items-Plugin".to_string(),
                value: "enabled".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_init_publishes_service() {
        let registry = ServiceRegistry::new();
        registry
            .register_service("db", Arc::new(DatabaseConnection::Disconnected))
            .await;

        let host = HostContext {
            db: DatabaseConnection::Disconnected,
            token_secret: None,
            domain: "localhost:8080".to_string(),
        };

        let mut plugin = ItemsPlugin::new();
        plugin.init(&host, &registry).await.unwrap();

        let services = plugin.provides();
        let handle = services.get("plugin_items.service").unwrap();
        assert!(handle.downcast_ref::<ItemsService>().is_some());
    }

    #[tokio::test]
    async fn test_start_before_init_is_lifecycle_error() {
        let plugin = ItemsPlugin::new();
        let err = plugin.start().await.unwrap_err();
        assert!(matches!(err, ModuleError::Lifecycle(_)));
    }

    #[test]
    fn test_update_request_partial() {
        let req: UpdatePluginItemRequest =
            serde_json::from_str(r#"{"name":"renamed"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("renamed"));
        assert!(req.description.is_none());
    }
}
