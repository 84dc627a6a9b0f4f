//! Outbound GitHub calls and the account/metrics persistence behind them.
//!
//! Errors cross this boundary as plain strings; the route layer maps
//! them to HTTP 400 like any other caller-input problem.

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use modhost_db::entities::{copilot_metric, github_account};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Subset of the GitHub `/user` response the plugin stores.
#[derive(Debug, serde::Deserialize)]
pub struct GithubUser {
    pub login: String,
    pub id: i64,
    pub node_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// GET `{api_base}/user` with the token under test.
pub async fn fetch_github_user(
    client: &reqwest::Client,
    api_base: &str,
    token: &str,
) -> Result<GithubUser, String> {
    let resp = client
        .get(format!("{api_base}/user"))
        .header("authorization", format!("token {token}"))
        .header("user-agent", "Visual Studio Code (desktop)")
        .send()
        .await
        .map_err(|e| format!("GitHub user request failed: {e}"))?;

    let resp = resp
        .error_for_status()
        .map_err(|e| format!("GitHub user request failed: {e}"))?;

    resp.json::<GithubUser>()
        .await
        .map_err(|e| format!("GitHub user response invalid: {e}"))
}

/// GET `{api_base}/copilot_internal/user` — the raw Copilot entitlement
/// and usage payload for the token's account.
pub async fn fetch_copilot_payload(
    client: &reqwest::Client,
    api_base: &str,
    token: &str,
) -> Result<serde_json::Value, String> {
    let resp = client
        .get(format!("{api_base}/copilot_internal/user"))
        .header("authorization", format!("Bearer {token}"))
        .header("user-agent", "Mozilla/5.0 (Macintosh; Intel Mac OS X)")
        .send()
        .await
        .map_err(|e| format!("Copilot metrics request failed: {e}"))?;

    let resp = resp
        .error_for_status()
        .map_err(|e| format!("Copilot metrics request failed: {e}"))?;

    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| format!("Copilot metrics response invalid: {e}"))
}

pub struct CopilotMetricsService {
    db: sea_orm::DatabaseConnection,
    api_base: String,
}

impl CopilotMetricsService {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self::with_api_base(db, GITHUB_API_BASE)
    }

    /// Point the service at a different API origin (test servers).
    pub fn with_api_base(db: sea_orm::DatabaseConnection, api_base: impl Into<String>) -> Self {
        Self {
            db,
            api_base: api_base.into(),
        }
    }

    fn client(&self, proxy: Option<&str>) -> Result<reqwest::Client, String> {
        let mut builder = reqwest::Client::builder().timeout(std::time::Duration::from_secs(20));
        if let Some(proxy) = proxy {
            let proxy =
                reqwest::Proxy::all(proxy).map_err(|e| format!("Invalid proxy URL: {e}"))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| format!("HTTP client error: {e}"))
    }

    /// Validate `token` against GitHub, encrypt it, and upsert the
    /// account it belongs to. Returns the account id.
    ///
    /// Re-importing a token for an already-known `github_user_id`
    /// refreshes the profile fields and the stored ciphertext.
    pub async fn import_account(
        &self,
        secret: &str,
        token: &str,
        proxy: Option<&str>,
    ) -> Result<i32, String> {
        let encrypted = super::crypto::encrypt_token(token, secret)?;

        let client = self.client(proxy)?;
        let user = fetch_github_user(&client, &self.api_base, token).await?;

        let existing = github_account::Entity::find()
            .filter(github_account::Column::GithubUserId.eq(user.id))
            .one(&self.db)
            .await
            .map_err(|e| format!("DB error: {e}"))?;

        let now = chrono::Utc::now().fixed_offset();
        let model = match existing {
            Some(account) => {
                let mut active: github_account::ActiveModel = account.into();
                active.login = Set(user.login);
                active.node_id = Set(user.node_id);
                active.avatar_url = Set(user.avatar_url);
                active.token_encrypted = Set(encrypted);
                active.updated_at = Set(now);
                active.update(&self.db).await
            }
            None => {
                let active = github_account::ActiveModel {
                    login: Set(user.login),
                    github_user_id: Set(user.id),
                    node_id: Set(user.node_id),
                    avatar_url: Set(user.avatar_url),
                    token_encrypted: Set(encrypted),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(&self.db).await
            }
        }
        .map_err(|e| format!("DB error: {e}"))?;

        tracing::info!(
            account_id = model.id,
            login = %model.login,
            "github account imported"
        );
        Ok(model.id)
    }

    /// Decrypt the stored token for `account_id`, pull a fresh metrics
    /// payload, and persist it. Returns the new metrics row id.
    pub async fn fetch_metrics(
        &self,
        secret: &str,
        account_id: i32,
        proxy: Option<&str>,
    ) -> Result<i32, String> {
        let account = github_account::Entity::find_by_id(account_id)
            .one(&self.db)
            .await
            .map_err(|e| format!("DB error: {e}"))?
            .ok_or_else(|| "Account not found".to_string())?;

        let token = super::crypto::decrypt_token(&account.token_encrypted, secret)?;

        let client = self.client(proxy)?;
        let payload = fetch_copilot_payload(&client, &self.api_base, &token).await?;

        let entry = copilot_metric::ActiveModel {
            account_id: Set(account.id),
            fetched_at: Set(chrono::Utc::now().fixed_offset()),
            payload: Set(payload),
            ..Default::default()
        };
        let model = entry
            .insert(&self.db)
            .await
            .map_err(|e| format!("DB error: {e}"))?;

        tracing::info!(
            account_id = account.id,
            metrics_id = model.id,
            "copilot metrics fetched"
        );
        Ok(model.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invalid_proxy_rejected() {
        let svc = CopilotMetricsService::new(sea_orm::DatabaseConnection::Disconnected);
        let err = svc.client(Some("not a url")).unwrap_err();
        assert!(err.contains("Invalid proxy URL"));
    }

    #[test]
    fn test_github_user_tolerates_missing_optionals() {
        let user: GithubUser =
            serde_json::from_str(r#"{"login":"octocat","id":583231}"#).unwrap();
        assert_eq!(user.login, "octocat");
        assert_eq!(user.id, 583231);
        assert!(user.node_id.is_none());
        assert!(user.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_fetch_github_user_sends_token_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "token ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "login": "octocat",
                "id": 583231,
                "node_id": "MDQ6VXNlcjU4MzIzMQ==",
                "avatar_url": "https://example.com/octocat.png"
            })))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let user = fetch_github_user(&client, &mock_server.uri(), "ghp_test")
            .await
            .unwrap();
        assert_eq!(user.login, "octocat");
        assert_eq!(user.id, 583231);
        assert_eq!(user.node_id.as_deref(), Some("MDQ6VXNlcjU4MzIzMQ=="));
    }

    #[tokio::test]
    async fn test_fetch_github_user_bad_token_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_github_user(&client, &mock_server.uri(), "bad")
            .await
            .unwrap_err();
        assert!(err.contains("GitHub user request failed"));
    }

    #[tokio::test]
    async fn test_fetch_copilot_payload_passes_through_json() {
        let mock_server = MockServer::start().await;
        let payload = serde_json::json!({
            "access_type_sku": "free_educational",
            "copilot_plan": "individual",
            "chat_enabled": true
        });
        Mock::given(method("GET"))
            .and(path("/copilot_internal/user"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let got = fetch_copilot_payload(&client, &mock_server.uri(), "ghp_test")
            .await
            .unwrap();
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn test_fetch_copilot_payload_non_json_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/copilot_internal/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_copilot_payload(&client, &mock_server.uri(), "ghp_test")
            .await
            .unwrap_err();
        assert!(err.contains("Copilot metrics response invalid"));
    }
}
