//! Minimal example plugin: one route, one provided service, no I/O.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Json, Router};

use modhost_db::AppState;
use modhost_plugin::{HostContext, Module, ModuleError, ServiceHandle, ServiceRegistry};

pub struct HelloPlugin;

impl HelloPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HelloPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for HelloPlugin {
    fn name(&self) -> &str {
        "hello"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn init(
        &mut self,
        _host: &HostContext,
        _registry: &ServiceRegistry,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn router(&self) -> Option<Router<Arc<AppState>>> {
        Some(Router::new().route("/", get(greet)))
    }

    fn provides(&self) -> HashMap<String, ServiceHandle> {
        let mut services = HashMap::new();
        services.insert(
            "hello.message".to_string(),
            Arc::new("Hello Service Ready".to_string()) as ServiceHandle,
        );
        services
    }
}

async fn greet() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello from plugin" }))
}
