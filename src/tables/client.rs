use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Default open platform endpoint
pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Upper bound on one open API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum records per batch create/delete call
pub const BATCH_LIMIT: usize = 500;

/// Page size used when listing records
const RECORD_PAGE_SIZE: usize = 500;

/// Page size used when listing tables
const TABLE_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error {code}: {message}")]
    RemoteApi { code: i64, message: String },
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),
}

pub type Result<T> = std::result::Result<T, TableError>;

/// Credentials of a self-built app on the open platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: String,
}

impl AppCredentials {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Fails with `ConfigurationMissing` when either half is blank
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() || self.app_secret.trim().is_empty() {
            return Err(TableError::ConfigurationMissing(
                "app id and app secret are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// User access token obtained through OAuth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserToken {
    pub access_token: String,
    pub refresh_token: String,
    pub open_id: String,
    pub expires_in: i64,
}

/// Operations the tracker performs against the open platform
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Tenant access token for table calls
    async fn tenant_access_token(&self, app: &AppCredentials) -> Result<String>;

    /// Exchange an OAuth authorization code for a user token
    async fn exchange_code(&self, app: &AppCredentials, code: &str) -> Result<UserToken>;

    /// Refresh a user token
    async fn refresh_user_token(&self, app: &AppCredentials, refresh_token: &str)
        -> Result<UserToken>;

    async fn list_tables(&self, token: &str, app_token: &str) -> Result<Vec<Value>>;

    /// Create a table; `table` is the upstream table definition
    async fn create_table(&self, token: &str, app_token: &str, table: Value) -> Result<Value>;

    async fn list_records(&self, token: &str, app_token: &str, table_id: &str)
        -> Result<Vec<Value>>;

    /// Create records, splitting into batches. Returns the number created.
    async fn batch_create(
        &self,
        token: &str,
        app_token: &str,
        table_id: &str,
        records: Vec<Value>,
    ) -> Result<usize>;

    /// Delete every record of a table. Returns the number deleted.
    async fn delete_all_records(&self, token: &str, app_token: &str, table_id: &str)
        -> Result<usize>;
}

/// HTTP client for the open platform
pub struct OpenPlatformClient {
    client: Client,
    base_url: String,
}

impl OpenPlatformClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and unwrap the `{code, msg, data}` envelope
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| TableError::Parse(format!("HTTP {}: {}", status, e)))?;
        check_envelope(body)
    }

    async fn app_access_token(&self, app: &AppCredentials) -> Result<String> {
        app.validate()?;
        let body = self
            .send(
                self.client
                    .post(self.url("auth/v3/app_access_token/internal"))
                    .json(&json!({ "app_id": app.app_id, "app_secret": app.app_secret })),
            )
            .await?;
        string_field(&body, "app_access_token")
    }

    async fn user_token(&self, app: &AppCredentials, path: &str, body: Value) -> Result<UserToken> {
        let app_token = self.app_access_token(app).await?;
        let response = self
            .send(
                self.client
                    .post(self.url(path))
                    .bearer_auth(app_token)
                    .json(&body),
            )
            .await?;
        let data = response
            .get("data")
            .ok_or_else(|| TableError::Parse("token response has no data".to_string()))?;

        Ok(UserToken {
            access_token: string_field(data, "access_token")?,
            refresh_token: string_field(data, "refresh_token")?,
            open_id: data
                .get("open_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            expires_in: data.get("expires_in").and_then(Value::as_i64).unwrap_or(0),
        })
    }

    /// Follow `page_token` until `has_more` is false, collecting `data.items`
    async fn list_paged(&self, token: &str, path: &str, page_size: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url(path))
                .bearer_auth(token)
                .query(&[("page_size", page_size.to_string())]);
            if let Some(ref pt) = page_token {
                request = request.query(&[("page_token", pt.as_str())]);
            }

            let body = self.send(request).await?;
            let data = body.get("data").cloned().unwrap_or(Value::Null);
            if let Some(page) = data.get("items").and_then(Value::as_array) {
                items.extend(page.iter().cloned());
            }

            let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            page_token = data
                .get("page_token")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || page_token.is_none() {
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl TableApi for OpenPlatformClient {
    async fn tenant_access_token(&self, app: &AppCredentials) -> Result<String> {
        app.validate()?;
        let body = self
            .send(
                self.client
                    .post(self.url("auth/v3/tenant_access_token/internal"))
                    .json(&json!({ "app_id": app.app_id, "app_secret": app.app_secret })),
            )
            .await?;
        string_field(&body, "tenant_access_token")
    }

    async fn exchange_code(&self, app: &AppCredentials, code: &str) -> Result<UserToken> {
        self.user_token(
            app,
            "authen/v1/access_token",
            json!({ "grant_type": "authorization_code", "code": code }),
        )
        .await
    }

    async fn refresh_user_token(
        &self,
        app: &AppCredentials,
        refresh_token: &str,
    ) -> Result<UserToken> {
        self.user_token(
            app,
            "authen/v1/refresh_access_token",
            json!({ "grant_type": "refresh_token", "refresh_token": refresh_token }),
        )
        .await
    }

    async fn list_tables(&self, token: &str, app_token: &str) -> Result<Vec<Value>> {
        self.list_paged(
            token,
            &format!("bitable/v1/apps/{}/tables", app_token),
            TABLE_PAGE_SIZE,
        )
        .await
    }

    async fn create_table(&self, token: &str, app_token: &str, table: Value) -> Result<Value> {
        let body = self
            .send(
                self.client
                    .post(self.url(&format!("bitable/v1/apps/{}/tables", app_token)))
                    .bearer_auth(token)
                    .json(&json!({ "table": table })),
            )
            .await?;
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn list_records(
        &self,
        token: &str,
        app_token: &str,
        table_id: &str,
    ) -> Result<Vec<Value>> {
        self.list_paged(
            token,
            &format!("bitable/v1/apps/{}/tables/{}/records", app_token, table_id),
            RECORD_PAGE_SIZE,
        )
        .await
    }

    async fn batch_create(
        &self,
        token: &str,
        app_token: &str,
        table_id: &str,
        records: Vec<Value>,
    ) -> Result<usize> {
        let url = self.url(&format!(
            "bitable/v1/apps/{}/tables/{}/records/batch_create",
            app_token, table_id
        ));

        let mut created = 0;
        for chunk in records.chunks(BATCH_LIMIT) {
            self.send(
                self.client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&json!({ "records": chunk })),
            )
            .await?;
            created += chunk.len();
        }
        Ok(created)
    }

    async fn delete_all_records(
        &self,
        token: &str,
        app_token: &str,
        table_id: &str,
    ) -> Result<usize> {
        let ids = record_ids(&self.list_records(token, app_token, table_id).await?);
        let url = self.url(&format!(
            "bitable/v1/apps/{}/tables/{}/records/batch_delete",
            app_token, table_id
        ));

        for chunk in ids.chunks(BATCH_LIMIT) {
            self.send(
                self.client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&json!({ "records": chunk })),
            )
            .await?;
        }
        log::debug!("Tables: deleted {} record(s) from {}", ids.len(), table_id);
        Ok(ids.len())
    }
}

/// Turn a non-zero `code` into `RemoteApi`
fn check_envelope(body: Value) -> Result<Value> {
    let code = body
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| TableError::Parse("response has no code".to_string()))?;

    if code != 0 {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(TableError::RemoteApi { code, message });
    }
    Ok(body)
}

fn string_field(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TableError::Parse(format!("missing field '{}'", field)))
}

fn record_ids(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get("record_id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}
