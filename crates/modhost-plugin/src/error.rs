//! Plugin system error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("no module registered under name: {0}")]
    Unresolved(String),

    #[error("module not loaded: {0}")]
    NotLoaded(String),

    #[error("init error: {0}")]
    Init(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("subscriber error: {0}")]
    Subscriber(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Display messages ──────────────────────────────────────────────

    #[test]
    fn test_display_unresolved() {
        let err = ModuleError::Unresolved("metrics".into());
        assert_eq!(err.to_string(), "no module registered under name: metrics");
    }

    #[test]
    fn test_display_not_loaded() {
        let err = ModuleError::NotLoaded("hello".into());
        assert_eq!(err.to_string(), "module not loaded: hello");
    }

    #[test]
    fn test_display_init() {
        let err = ModuleError::Init("missing db service".into());
        assert_eq!(err.to_string(), "init error: missing db service");
    }

    #[test]
    fn test_display_lifecycle() {
        let err = ModuleError::Lifecycle("table creation failed".into());
        assert_eq!(err.to_string(), "lifecycle error: table creation failed");
    }

    #[test]
    fn test_display_subscriber() {
        let err = ModuleError::Subscriber("handler refused payload".into());
        assert_eq!(
            err.to_string(),
            "subscriber error: handler refused payload"
        );
    }

    #[test]
    fn test_display_http() {
        let err = ModuleError::Http("timeout".into());
        assert_eq!(err.to_string(), "HTTP error: timeout");
    }

    // ── From conversions ──────────────────────────────────────────────

    #[test]
    fn test_from_db_error() {
        let db_err = sea_orm::DbErr::Custom("test db error".into());
        let err: ModuleError = db_err.into();
        assert!(matches!(err, ModuleError::Database(_)));
        assert!(err.to_string().contains("test db error"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("bad json{{{").unwrap_err();
        let err: ModuleError = json_err.into();
        assert!(matches!(err, ModuleError::Serialization(_)));
    }

    #[test]
    fn test_debug_formatting() {
        let err = ModuleError::NotLoaded("test".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("NotLoaded"));
        assert!(debug.contains("test"));
    }
}
