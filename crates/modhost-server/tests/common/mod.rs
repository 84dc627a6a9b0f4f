// Shared test utilities for integration tests
use std::sync::Arc;

use axum::{routing::get, Router};

use modhost_db::AppState;
use modhost_plugin::{HostContext, PluginManager, ServiceRegistry};
use modhost_server::{api, plugins};

pub fn test_host() -> HostContext {
    HostContext {
        db: sea_orm::DatabaseConnection::Disconnected,
        token_secret: Some("test-token-secret".to_string()),
        domain: "test.modhost.local".to_string(),
    }
}

/// Manager with a mock database and all built-in factories registered.
pub async fn test_manager() -> Arc<PluginManager> {
    let registry = Arc::new(ServiceRegistry::new());
    let manager = Arc::new(PluginManager::new(test_host(), registry));
    manager.register_core_services().await;
    plugins::register_builtin_factories(&manager);
    manager
}

/// Assemble the application the way `main` does — plugins loaded and
/// started, admin routes plus plugin route-groups under `/plugins`,
/// collected middleware applied — against a mock database.
///
/// `start` must be a subset of `load` whose `start()` hooks do no
/// database work; the mock connection panics on queries.
pub async fn test_app(load: &[&str], start: &[&str]) -> axum_test::TestServer {
    let manager = test_manager().await;
    for name in load {
        manager.load(name).await;
    }
    for name in start {
        manager
            .start(name)
            .await
            .unwrap_or_else(|e| panic!("start {name}: {e}"));
    }

    let plugin_routes = api::plugins::router().merge(manager.take_plugin_router().await);

    let state = Arc::new(AppState {
        db: sea_orm::DatabaseConnection::Disconnected,
        token_secret: Some("test-token-secret".to_string()),
        domain: "test.modhost.local".to_string(),
        plugins: Some(manager.clone() as Arc<dyn std::any::Any + Send + Sync>),
    });

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route(
            "/items",
            get(api::items::list_items).post(api::items::create_item),
        )
        .nest("/plugins", plugin_routes);

    let app = manager.apply_middleware(app).await.with_state(state);
    axum_test::TestServer::new(app).expect("failed to build test server")
}
