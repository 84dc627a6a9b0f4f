//! Plugin manager — orchestrates module discovery, loading, starting,
//! stopping, and unloading against the host application and the shared
//! service registry.
//!
//! Module implementations are resolved from an explicit factory table
//! keyed by name; there is no reflection or directory scanning. All
//! state-mutating operations are serialized behind one manager-wide
//! lock, so concurrent administrative calls are safe.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ModuleError;
use crate::module::{HostContext, MiddlewareSpec, Module, ModuleRecord, ModuleStatus};
use crate::registry::ServiceRegistry;
use modhost_db::AppState;

/// Factory producing a fresh, uninitialized module instance.
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn Module> + Send + Sync>;

struct ManagerInner {
    /// Live module set: names with a successfully initialized instance.
    modules: HashMap<String, Box<dyn Module>>,
    /// State table: one record per name that has seen a `load` attempt.
    states: HashMap<String, ModuleRecord>,
    /// Route-groups collected during `load`, drained once by the host
    /// before serving begins.
    pending_routers: Vec<(String, Router<Arc<AppState>>)>,
    /// Middleware declarations collected during `load`.
    pending_middleware: Vec<MiddlewareSpec>,
    /// Set once the host has taken the plugin router; later loads can no
    /// longer mount routes (axum routers are immutable once served).
    router_taken: bool,
}

pub struct PluginManager {
    host: HostContext,
    registry: Arc<ServiceRegistry>,
    factories: std::sync::RwLock<HashMap<String, ModuleFactory>>,
    inner: Mutex<ManagerInner>,
}

impl PluginManager {
    pub fn new(host: HostContext, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            host,
            registry,
            factories: std::sync::RwLock::new(HashMap::new()),
            inner: Mutex::new(ManagerInner {
                modules: HashMap::new(),
                states: HashMap::new(),
                pending_routers: Vec::new(),
                pending_middleware: Vec::new(),
                router_taken: false,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Publish the core services every module may rely on: currently the
    /// pooled database connection, under the `"db"` key.
    pub async fn register_core_services(&self) {
        self.registry
            .register_service("db", Arc::new(self.host.db.clone()))
            .await;
    }

    /// Register a factory for `name`. Factories registered under an
    /// existing name replace the earlier entry.
    pub fn register_factory<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(name.to_string(), Box::new(factory));
    }

    /// List the module names available in the factory table. Pure read;
    /// an empty table yields an empty list, not an error.
    pub fn discover(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load `name`: resolve its factory, initialize the module, collect
    /// its middleware and route-group for pre-serve mounting, and
    /// publish its provided services.
    ///
    /// Idempotent: a name that already has a record is returned
    /// unchanged. Resolution and init failures are converted into a
    /// `failed` record; `load` itself never returns an error.
    pub async fn load(&self, name: &str) -> ModuleRecord {
        let mut inner = self.inner.lock().await;

        if let Some(record) = inner.states.get(name) {
            return record.clone();
        }

        let module = {
            let factories = self
                .factories
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            factories.get(name).map(|f| f())
        };

        let Some(mut module) = module else {
            let err = ModuleError::Unresolved(name.to_string());
            tracing::error!(plugin_name = %name, "failed to load plugin: {err}");
            let record = ModuleRecord {
                name: name.to_string(),
                version: "unknown".to_string(),
                status: ModuleStatus::Failed,
                last_error: Some(err.to_string()),
            };
            inner.states.insert(name.to_string(), record.clone());
            return record;
        };

        if let Err(e) = module.init(&self.host, &self.registry).await {
            tracing::error!(plugin_name = %name, "failed to load plugin: {e}");
            let record = ModuleRecord {
                name: name.to_string(),
                version: "unknown".to_string(),
                status: ModuleStatus::Failed,
                last_error: Some(e.to_string()),
            };
            inner.states.insert(name.to_string(), record.clone());
            return record;
        }

        // Middleware must land on the host before it starts serving;
        // specs declared after the router was taken cannot apply.
        let middleware = module.middlewares();
        let router = module.router();
        if inner.router_taken && (!middleware.is_empty() || router.is_some()) {
            tracing::warn!(
                plugin_name = %name,
                "host router already built; routes and middleware of this \
                 plugin stay unmounted until the process restarts"
            );
        } else {
            inner.pending_middleware.extend(middleware);
            if let Some(router) = router {
                inner.pending_routers.push((name.to_string(), router));
            }
        }

        for (service, handle) in module.provides() {
            self.registry.register_service(&service, handle).await;
        }

        let record = ModuleRecord {
            name: name.to_string(),
            version: module.version().to_string(),
            status: ModuleStatus::Loaded,
            last_error: None,
        };
        inner.modules.insert(name.to_string(), module);
        inner.states.insert(name.to_string(), record.clone());
        tracing::info!(plugin_name = %name, version = %record.version, "plugin loaded");
        record
    }

    /// Start `name`. Starting a name absent from the live set is a
    /// caller mistake and surfaces as `ModuleError::NotLoaded`; a
    /// failing `start()` hook instead yields a retained `failed` record,
    /// retryable by calling `start` again.
    pub async fn start(&self, name: &str) -> Result<ModuleRecord, ModuleError> {
        let mut inner = self.inner.lock().await;
        let result = match inner.modules.get(name) {
            Some(module) => module.start().await,
            None => return Err(ModuleError::NotLoaded(name.to_string())),
        };

        let Some(state) = inner.states.get_mut(name) else {
            return Err(ModuleError::NotLoaded(name.to_string()));
        };
        match result {
            Ok(()) => {
                state.status = ModuleStatus::Started;
                state.last_error = None;
                tracing::info!(plugin_name = %name, "plugin started");
            }
            Err(e) => {
                state.status = ModuleStatus::Failed;
                state.last_error = Some(e.to_string());
                tracing::error!(plugin_name = %name, "failed to start plugin: {e}");
            }
        }
        Ok(state.clone())
    }

    /// Stop `name`. Same precondition and failure handling as `start`.
    pub async fn stop(&self, name: &str) -> Result<ModuleRecord, ModuleError> {
        let mut inner = self.inner.lock().await;
        let result = match inner.modules.get(name) {
            Some(module) => module.stop().await,
            None => return Err(ModuleError::NotLoaded(name.to_string())),
        };

        let Some(state) = inner.states.get_mut(name) else {
            return Err(ModuleError::NotLoaded(name.to_string()));
        };
        match result {
            Ok(()) => {
                state.status = ModuleStatus::Stopped;
                state.last_error = None;
                tracing::info!(plugin_name = %name, "plugin stopped");
            }
            Err(e) => {
                state.status = ModuleStatus::Failed;
                state.last_error = Some(e.to_string());
                tracing::error!(plugin_name = %name, "failed to stop plugin: {e}");
            }
        }
        Ok(state.clone())
    }

    /// Unload `name`: best-effort `stop` (failure ignored, the module is
    /// being discarded), then remove it from the live set and the state
    /// table. Unknown names are a no-op.
    pub async fn unload(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(module) = inner.modules.remove(name) {
            if let Err(e) = module.stop().await {
                tracing::warn!(plugin_name = %name, "stop during unload failed: {e}");
            }
        }
        if inner.states.remove(name).is_some() {
            tracing::info!(plugin_name = %name, "plugin unloaded");
        }
    }

    /// All tracked records, name-sorted for stable output.
    pub async fn list_states(&self) -> Vec<ModuleRecord> {
        let inner = self.inner.lock().await;
        let mut records: Vec<ModuleRecord> = inner.states.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Number of modules currently in the live set.
    pub async fn loaded_count(&self) -> usize {
        self.inner.lock().await.modules.len()
    }

    /// Build the router holding every loaded plugin's route-group, each
    /// nested under `/{name}`. Must be called exactly once, before the
    /// host begins serving; the host nests the result under `/plugins`.
    pub async fn take_plugin_router(&self) -> Router<Arc<AppState>> {
        let mut inner = self.inner.lock().await;
        inner.router_taken = true;
        let mut router = Router::new();
        for (name, group) in inner.pending_routers.drain(..) {
            router = router.nest(&format!("/{name}"), group);
        }
        router
    }

    /// Apply every collected middleware declaration to the app router.
    /// Invalid header names or values are logged and skipped.
    pub async fn apply_middleware(
        &self,
        mut app: Router<Arc<AppState>>,
    ) -> Router<Arc<AppState>> {
        let mut inner = self.inner.lock().await;
        for spec in inner.pending_middleware.drain(..) {
            match spec {
                MiddlewareSpec::SetResponseHeader { name, value } => {
                    let header = HeaderName::from_bytes(name.as_bytes());
                    let header_value = HeaderValue::from_str(&value);
                    let (Ok(header), Ok(header_value)) = (header, header_value) else {
                        tracing::warn!(header = %name, "invalid response header spec, skipping");
                        continue;
                    };
                    app = app.layer(SetResponseHeaderLayer::overriding(header, header_value));
                }
            }
        }
        app
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
