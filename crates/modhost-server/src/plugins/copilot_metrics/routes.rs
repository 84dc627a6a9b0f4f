//! HTTP surface of the copilot_metrics plugin, mounted under
//! `/plugins/copilot_metrics`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

use modhost_db::entities::{copilot_metric, github_account};
use modhost_db::AppState;

use super::service::CopilotMetricsService;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts/import", post(import_account))
        .route("/accounts", get(list_accounts))
        .route("/accounts/{id}", get(get_account))
        .route("/metrics/fetch/{id}", post(fetch_metrics))
        .route("/metrics", get(latest_metrics_all))
        .route("/metrics/{account_id}", get(latest_metrics_for_account))
}

#[derive(Debug, Deserialize)]
pub struct ImportAccountRequest {
    pub token: String,
    pub proxy: Option<String>,
}

fn db_error(e: sea_orm::DbErr) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!("copilot_metrics query failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": format!("DB error: {e}") })),
    )
}

fn bad_request(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": detail })),
    )
}

fn token_secret(state: &AppState) -> Result<&str, (StatusCode, Json<serde_json::Value>)> {
    state
        .token_secret
        .as_deref()
        .ok_or_else(|| bad_request("MODHOST_TOKEN_SECRET not configured".to_string()))
}

/// POST /plugins/copilot_metrics/accounts/import
async fn import_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportAccountRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let secret = token_secret(&state)?;
    let svc = CopilotMetricsService::new(state.db.clone());
    let account_id = svc
        .import_account(secret, &body.token, body.proxy.as_deref())
        .await
        .map_err(bad_request)?;
    Ok(Json(serde_json::json!({ "account_id": account_id })))
}

/// GET /plugins/copilot_metrics/accounts
async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<github_account::Model>>, (StatusCode, Json<serde_json::Value>)> {
    let accounts = github_account::Entity::find()
        .order_by_desc(github_account::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error)?;
    Ok(Json(accounts))
}

/// GET /plugins/copilot_metrics/accounts/:id
async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<github_account::Model>, (StatusCode, Json<serde_json::Value>)> {
    let account = github_account::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Account not found" })),
        ))?;
    Ok(Json(account))
}

/// POST /plugins/copilot_metrics/metrics/fetch/:id
async fn fetch_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let secret = token_secret(&state)?;
    let svc = CopilotMetricsService::new(state.db.clone());
    let metrics_id = svc
        .fetch_metrics(secret, id, None)
        .await
        .map_err(bad_request)?;
    Ok(Json(serde_json::json!({ "metrics_id": metrics_id })))
}

/// GET /plugins/copilot_metrics/metrics — the latest row per account.
async fn latest_metrics_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<copilot_metric::Model>>, (StatusCode, Json<serde_json::Value>)> {
    // Rows arrive grouped per account, newest first within the group,
    // so the first row seen per account is its latest.
    let all = copilot_metric::Entity::find()
        .order_by_asc(copilot_metric::Column::AccountId)
        .order_by_desc(copilot_metric::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let mut latest = Vec::new();
    let mut last_account = None;
    for row in all {
        if last_account != Some(row.account_id) {
            last_account = Some(row.account_id);
            latest.push(row);
        }
    }
    Ok(Json(latest))
}

/// GET /plugins/copilot_metrics/metrics/:account_id
async fn latest_metrics_for_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i32>,
) -> Result<Json<copilot_metric::Model>, (StatusCode, Json<serde_json::Value>)> {
    let row = copilot_metric::Entity::find()
        .filter(copilot_metric::Column::AccountId.eq(account_id))
        .order_by_desc(copilot_metric::Column::Id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Metrics not found" })),
        ))?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_request_optional_proxy() {
        let req: ImportAccountRequest =
            serde_json::from_str(r#"{"token":"ghp_abc"}"#).unwrap();
        assert_eq!(req.token, "ghp_abc");
        assert!(req.proxy.is_none());
    }

    #[test]
    fn test_missing_secret_is_bad_request() {
        let state = AppState {
            db: sea_orm::DatabaseConnection::Disconnected,
            token_secret: None,
            domain: "localhost:8080".to_string(),
            plugins: None,
        };
        let err = token_secret(&state).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
