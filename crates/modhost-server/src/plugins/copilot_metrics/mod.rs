//! GitHub Copilot metrics plugin.
//!
//! Imports GitHub accounts by personal access token (stored encrypted,
//! see [`crypto`]), then pulls Copilot usage payloads on demand. Owns
//! the `github_accounts` and `copilot_metrics` tables; both are created
//! by `start()` once the database is confirmed reachable.

pub mod crypto;
pub mod routes;
pub mod service;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use sea_orm::{ConnectionTrait, DatabaseConnection};

use modhost_db::AppState;
use modhost_plugin::{HostContext, Module, ModuleError, ServiceHandle, ServiceRegistry};

use service::CopilotMetricsService;

pub struct CopilotMetricsPlugin {
    db: Option<DatabaseConnection>,
    services: HashMap<String, ServiceHandle>,
}

impl CopilotMetricsPlugin {
    pub fn new() -> Self {
        Self {
            db: None,
            services: HashMap::new(),
        }
    }
}

impl Default for CopilotMetricsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for CopilotMetricsPlugin {
    fn name(&self) -> &str {
        "copilot_metrics"
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
            "copilot_metrics.service".to_string(),
            Arc::new(CopilotMetricsService::new(db.clone())) as ServiceHandle,
        );
        self.db = Some(db);
        Ok(())
    }

    async fn start(&self) -> Result<(), ModuleError> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| ModuleError::Lifecycle("copilot_metrics plugin not initialized".into()))?;
        db.execute_unprepared(
            r#"
            CREATE TABLE IF NOT EXISTS github_accounts (
                id SERIAL PRIMARY KEY,
                login VARCHAR(255) NOT NULL,
                github_user_id BIGINT NOT NULL UNIQUE,
                node_id VARCHAR(255),
                avatar_url TEXT,
                token_encrypted TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .await?;
        db.execute_unprepared(
            r#"
            CREATE TABLE IF NOT EXISTS copilot_metrics (
                id SERIAL PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES github_accounts(id) ON DELETE CASCADE,
                fetched_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                payload JSONB NOT NULL
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
        Some(routes::router())
    }

    fn provides(&self) -> HashMap<String, ServiceHandle> {
        self.services.clone()
    }
}
