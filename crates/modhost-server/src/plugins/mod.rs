//! Built-in plugins shipped with the server binary.
//!
//! Each one conforms to the same `Module` contract; the manager is
//! agnostic to which variant it drives.

pub mod analytics;
pub mod copilot_metrics;
pub mod hello;
pub mod items;

use sea_orm::DatabaseConnection;

use modhost_plugin::{ModuleError, PluginManager, ServiceRegistry};

/// Register factories for every built-in plugin. Only the names listed
/// in `PLUGINS_ENABLED` are actually loaded.
pub fn register_builtin_factories(manager: &PluginManager) {
    manager.register_factory("hello", || Box::new(hello::HelloPlugin::new()));
    manager.register_factory("analytics", || Box::new(analytics::AnalyticsPlugin::new()));
    manager.register_factory("items", || Box::new(items::ItemsPlugin::new()));
    manager.register_factory("copilot_metrics", || {
        Box::new(copilot_metrics::CopilotMetricsPlugin::new())
    });
}

/// Resolve the core database handle published into the registry by
/// `register_core_services`.
pub(crate) async fn db_from_registry(
    registry: &ServiceRegistry,
) -> Result<DatabaseConnection, ModuleError> {
    let handle = registry
        .get_service("db")
        .await
        .ok_or_else(|| ModuleError::Init("db service not registered".into()))?;
    handle
        .downcast_ref::<DatabaseConnection>()
        .cloned()
        .ok_or_else(|| ModuleError::Init("db service has unexpected type".into()))
}
