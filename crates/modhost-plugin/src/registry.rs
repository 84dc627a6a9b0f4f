//! Service registry — process-wide service locator plus a minimal
//! publish/subscribe event bus.
//!
//! One registry instance is owned per manager and passed explicitly into
//! every module's `init`; there is no hidden global, so tests can run
//! independent registries side by side.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::ModuleError;
use crate::module::ServiceHandle;

/// Event bus subscriber. Failures are inspected and discarded by
/// `publish`, never propagated to the publisher.
pub type EventHandler =
    Box<dyn Fn(&serde_json::Value) -> Result<(), ModuleError> + Send + Sync>;

pub struct ServiceRegistry {
    /// Service key → opaque handle. Later registrations for the same key
    /// overwrite earlier ones.
    services: RwLock<HashMap<String, ServiceHandle>>,
    /// Topic → subscribers in subscription order.
    subscribers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    // ── Services ─────────────────────────────────────────────────────

    /// Insert or overwrite a service handle. Always succeeds.
    pub async fn register_service(&self, name: &str, handle: ServiceHandle) {
        let mut services = self.services.write().await;
        if services.insert(name.to_string(), handle).is_some() {
            tracing::debug!(service = %name, "service overwritten in registry");
        }
    }

    /// Look up a service handle. Absence is a normal outcome callers
    /// must check, not an error.
    pub async fn get_service(&self, name: &str) -> Option<ServiceHandle> {
        self.services.read().await.get(name).cloned()
    }

    pub async fn has_service(&self, name: &str) -> bool {
        self.services.read().await.contains_key(name)
    }

    // ── Event bus ────────────────────────────────────────────────────

    /// Append a handler for `topic`.
    pub async fn subscribe(&self, topic: &str, handler: EventHandler) {
        let mut subs = self.subscribers.write().await;
        subs.entry(topic.to_string()).or_default().push(handler);
    }

    /// Invoke every handler subscribed to `topic`, in subscription
    /// order. A failing handler is logged and skipped; the remaining
    /// handlers still run and the publisher never observes the failure.
    pub async fn publish(&self, topic: &str, payload: &serde_json::Value) {
        let subs = self.subscribers.read().await;
        let Some(handlers) = subs.get(topic) else {
            return;
        };
        for (idx, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler(payload) {
                tracing::warn!(
                    topic = %topic,
                    subscriber = idx,
                    "event handler failed: {e}"
                );
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
