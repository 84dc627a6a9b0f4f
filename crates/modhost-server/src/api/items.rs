//! Core items CRUD endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use serde::Deserialize;
use std::sync::Arc;

use modhost_db::entities::item;
use modhost_db::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

fn db_error(e: sea_orm::DbErr) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!("items query failed: {e}");
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

/// POST /items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateItemRequest>,
) -> Result<Json<item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let entry = item::ActiveModel {
        name: Set(body.name),
        description: Set(body.description),
        created_at: Set(chrono::Utc::now().fixed_offset()),
        ..Default::default()
    };

    let model = entry.insert(&state.db).await.map_err(db_error)?;
    Ok(Json(model))
}

/// GET /items?skip=0&limit=100
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<item::Model>>, (StatusCode, Json<serde_json::Value>)> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let items = item::Entity::find()
        .order_by_asc(item::Column::Id)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(items))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let model = item::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    Ok(Json(model))
}

/// PUT /items/:id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<item::Model>, (StatusCode, Json<serde_json::Value>)> {
    let model = item::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(not_found)?;

    let mut active: item::ActiveModel = model.into();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(updated))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let result = item::Entity::delete_by_id(id)
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
    fn test_list_params_defaults() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.skip.unwrap_or(0), 0);
        assert_eq!(params.limit.unwrap_or(100), 100);
    }

    #[test]
    fn test_create_request_optional_description() {
        let req: CreateItemRequest = serde_json::from_str(r#"{"name":"widget"}"#).unwrap();
        assert_eq!(req.name, "widget");
        assert!(req.description.is_none());
    }

    #[test]
    fn test_update_request_partial() {
        let req: UpdateItemRequest =
            serde_json::from_str(r#"{"description":"new text"}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.description.as_deref(), Some("new text"));
    }
}
