//! modhost Plugin System
//!
//! In-process plugin host for the modhost API server. Modules are
//! registered through an explicit factory table, wired into a shared
//! axum application and service registry by the `PluginManager`, and
//! tracked through a small lifecycle state machine. A failure inside
//! one module never aborts the host or its sibling modules.

pub mod error;
pub mod manager;
pub mod module;
pub mod registry;

pub use error::ModuleError;
pub use manager::PluginManager;
pub use module::{
    HostContext, MiddlewareSpec, Module, ModuleRecord, ModuleStatus, ServiceHandle,
};
pub use registry::{EventHandler, ServiceRegistry};
