use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use modhost_db::AppState;
use modhost_plugin::{HostContext, ModuleStatus, PluginManager, ServiceRegistry};
use modhost_server::{api, config::ServerConfig, plugins};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();

    // Database connection
    let db_config = modhost_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = modhost_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    modhost_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    tracing::info!("instance domain: {}", config.domain);

    // Plugin manager: load before the router is built so declared
    // middleware and route-groups can still be mounted. Starting is
    // deferred until the database round-trip below succeeds.
    let registry = Arc::new(ServiceRegistry::new());
    let host = HostContext {
        db: db.clone(),
        token_secret: config.token_secret.clone(),
        domain: config.domain.clone(),
    };
    let manager = Arc::new(PluginManager::new(host, registry.clone()));
    manager.register_core_services().await;
    plugins::register_builtin_factories(&manager);

    for name in &config.plugins_enabled {
        manager.load(name).await;
    }

    modhost_db::ping(&db)
        .await
        .expect("database not reachable at startup");
    tracing::info!("database connection established");

    for record in manager.list_states().await {
        if record.status != ModuleStatus::Loaded {
            continue;
        }
        if let Err(e) = manager.start(&record.name).await {
            tracing::error!(plugin_name = %record.name, "failed to start plugin: {e}");
        }
    }
    tracing::info!(plugins = ?config.plugins_enabled, "plugins initialized");

    registry
        .publish(
            "host.started",
            &serde_json::json!({ "plugins": config.plugins_enabled }),
        )
        .await;

    let state = Arc::new(AppState {
        db,
        token_secret: config.token_secret.clone(),
        domain: config.domain.clone(),
        plugins: Some(manager.clone() as Arc<dyn std::any::Any + Send + Sync>),
    });

    // CORS configuration — restrict to configured origins
    let cors = if config.cors_origins.is_empty() {
        tracing::warn!(
            "CORS_ORIGINS not set — defaulting to same-origin only. \
             Set CORS_ORIGINS=http://localhost:3000 for dev."
        );
        let origin = format!("http://{}", config.domain);
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(
                HeaderValue::from_str(&origin)
                    .unwrap_or_else(|_| HeaderValue::from_static("http://localhost")),
            ))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        tracing::info!("CORS allowed origins: {:?}", origins);
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    };

    // Admin endpoints and plugin route-groups share the /plugins prefix.
    let plugin_routes = api::plugins::router().merge(manager.take_plugin_router().await);

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route(
            "/items",
            get(api::items::list_items).post(api::items::create_item),
        )
        .route(
            "/items/{id}",
            get(api::items::get_item)
                .put(api::items::update_item)
                .delete(api::items::delete_item),
        )
        .nest("/plugins", plugin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let app = manager.apply_middleware(app).await.with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listen address"),
        app,
    )
    .await
    .expect("server error");
}
