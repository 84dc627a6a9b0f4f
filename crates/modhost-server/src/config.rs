//! Server configuration, sourced from environment variables (a `.env`
//! file is loaded by `main` before this runs).

use std::env;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub domain: String,
    /// Plugin names to auto-load and auto-start, in order. An empty
    /// list means no plugins are active.
    pub plugins_enabled: Vec<String>,
    /// Secret used to encrypt third-party tokens at rest
    /// (hex string, e.g. `openssl rand -hex 32`).
    pub token_secret: Option<String>,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let raw_plugins =
            env::var("PLUGINS_ENABLED").unwrap_or_else(|_| "hello,analytics".to_string());

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            domain: env::var("MODHOST_DOMAIN").unwrap_or_else(|_| "localhost:8080".to_string()),
            plugins_enabled: parse_name_list(&raw_plugins),
            token_secret: env::var("MODHOST_TOKEN_SECRET").ok(),
            cors_origins: parse_name_list(&env::var("CORS_ORIGINS").unwrap_or_default()),
        }
    }
}

/// Split a comma-separated list, trimming whitespace and dropping
/// empty entries.
fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
