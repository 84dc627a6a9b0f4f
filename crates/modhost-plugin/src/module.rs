//! The module contract every plugin implements, plus the state types the
//! manager tracks per module name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::error::ModuleError;
use crate::registry::ServiceRegistry;
use modhost_db::AppState;

/// Opaque reference to a service published into the registry.
///
/// Consumers downcast to the concrete type they expect.
pub type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// References a module may capture during `init`.
///
/// Carries the host-owned collaborators a module is allowed to hold on
/// to: the pooled database connection and the relevant configuration.
#[derive(Clone)]
pub struct HostContext {
    pub db: DatabaseConnection,
    /// Secret used by modules that encrypt third-party tokens at rest.
    pub token_secret: Option<String>,
    pub domain: String,
}

/// A cross-cutting interceptor a module asks the host to install.
///
/// Installed app-wide before the host starts serving; axum layers added
/// after `serve` would never apply, so the manager collects these during
/// `load` and the host drains them at assembly time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareSpec {
    SetResponseHeader { name: String, value: String },
}

/// Lifecycle status of one module name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Loaded,
    Started,
    Stopped,
    Failed,
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModuleStatus::Loaded => "loaded",
            ModuleStatus::Started => "started",
            ModuleStatus::Stopped => "stopped",
            ModuleStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The manager's tracked state for one module name.
///
/// Created on first `load` attempt (successful or failed), mutated in
/// place by `start`/`stop`, removed by `unload`. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    pub version: String,
    pub status: ModuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Capability set every plugin implements.
///
/// `init` is pure wiring: build the route-group, capture services from
/// the registry, no external I/O. `start` is where I/O belongs (table
/// creation, outbound connections) and is deferred by the host until the
/// database is confirmed reachable. `stop` must be safe to call even if
/// `start` partially failed.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    async fn init(
        &mut self,
        host: &HostContext,
        registry: &ServiceRegistry,
    ) -> Result<(), ModuleError>;

    async fn start(&self) -> Result<(), ModuleError>;

    async fn stop(&self) -> Result<(), ModuleError>;

    /// Route-group the module exposes, mounted under `/plugins/{name}`.
    fn router(&self) -> Option<Router<Arc<AppState>>> {
        None
    }

    /// Services to publish into the registry after successful init.
    fn provides(&self) -> HashMap<String, ServiceHandle> {
        HashMap::new()
    }

    /// Declared ordering dependencies on other module names.
    ///
    /// Collected but not enforced; load order is the caller-supplied
    /// list order.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Interceptors to install on the host before serving begins.
    fn middlewares(&self) -> Vec<MiddlewareSpec> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ModuleStatus::Loaded).unwrap(),
            serde_json::json!("loaded")
        );
        assert_eq!(
            serde_json::to_value(ModuleStatus::Failed).unwrap(),
            serde_json::json!("failed")
        );
    }

    #[test]
    fn test_record_omits_absent_error() {
        let rec = ModuleRecord {
            name: "hello".into(),
            version: "1.0.0".into(),
            status: ModuleStatus::Loaded,
            last_error: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["name"], "hello");
        assert_eq!(json["status"], "loaded");
        assert!(json.get("last_error").is_none());
    }

    #[test]
    fn test_record_includes_error_when_failed() {
        let rec = ModuleRecord {
            name: "broken".into(),
            version: "unknown".into(),
            status: ModuleStatus::Failed,
            last_error: Some("init error: boom".into()),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["last_error"], "init error: boom");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ModuleStatus::Started.to_string(), "started");
        assert_eq!(ModuleStatus::Stopped.to_string(), "stopped");
    }
}
