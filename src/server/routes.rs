//! Axum route handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use super::models::{ErrorResponse, ExchangeRequest, HealthResponse, ProxyAction, TableProxyRequest};
use super::AppState;
use crate::tables::{AppCredentials, TableError, UserToken};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn upstream(e: TableError) -> ApiError {
    log::warn!("Proxy: upstream call failed: {}", e);
    internal(e.to_string())
}

/// Non-blank field or a 400 naming it
fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(format!("{} is required", name)))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /auth/exchange`: authorization code or refresh token for a user token
pub async fn auth_exchange(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<UserToken>, ApiError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;

    let refresh = request.is_refresh();
    let grant = if refresh {
        required(request.refresh_token, "refresh_token")?
    } else {
        required(request.code, "code")?
    };

    let app = state
        .config
        .oauth_credentials()
        .ok_or_else(|| internal("OAuth app credentials are not configured on the server"))?;

    let token = if refresh {
        state.api.refresh_user_token(&app, &grant).await
    } else {
        state.api.exchange_code(&app, &grant).await
    }
    .map_err(upstream)?;

    log::info!(
        "Proxy: issued user token for {} ({})",
        if token.open_id.is_empty() { "unknown user" } else { token.open_id.as_str() },
        if refresh { "refresh" } else { "code" }
    );
    Ok(Json(token))
}

/// `POST /table-proxy`: table operations with caller-supplied app credentials
pub async fn table_proxy(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TableProxyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;

    let app = AppCredentials::new(
        request.app_id.unwrap_or_default().trim(),
        request.app_secret.unwrap_or_default().trim(),
    );
    app.validate()
        .map_err(|_| bad_request("appId and appSecret are required"))?;

    let action = ProxyAction::parse(&request.action)
        .ok_or_else(|| bad_request(format!("unknown action '{}'", request.action)))?;

    let app_token = if action.needs_app_token() {
        required(request.app_token, "appToken")?
    } else {
        String::new()
    };
    let table_id = if action.needs_table_id() {
        required(request.table_id, "tableId")?
    } else {
        String::new()
    };

    let data = request.data.unwrap_or(Value::Null);
    let records = if action == ProxyAction::BatchCreate {
        data.get("records")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| bad_request("data.records must be an array"))?
    } else {
        Vec::new()
    };
    if action == ProxyAction::CreateTable && data.is_null() {
        return Err(bad_request("data is required for createTable"));
    }

    log::debug!("Proxy: {:?} for app {}", action, app.app_id);
    let api = &state.api;
    let token = api.tenant_access_token(&app).await.map_err(upstream)?;

    let result = match action {
        ProxyAction::GetToken => json!({ "token": token }),
        ProxyAction::TestConnection => {
            let tables = api.list_tables(&token, &app_token).await.map_err(upstream)?;
            json!({ "ok": true, "tableCount": tables.len() })
        }
        ProxyAction::ListTables => {
            let tables = api.list_tables(&token, &app_token).await.map_err(upstream)?;
            json!({ "tables": tables })
        }
        ProxyAction::CreateTable => {
            // Accept either the table definition itself or `{table: ...}`
            let table = data.get("table").cloned().unwrap_or(data);
            api.create_table(&token, &app_token, table)
                .await
                .map_err(upstream)?
        }
        ProxyAction::ListRecords => {
            let records = api
                .list_records(&token, &app_token, &table_id)
                .await
                .map_err(upstream)?;
            json!({ "records": records })
        }
        ProxyAction::BatchCreate => {
            let created = api
                .batch_create(&token, &app_token, &table_id, records)
                .await
                .map_err(upstream)?;
            json!({ "created": created })
        }
        ProxyAction::DeleteAllRecords => {
            let deleted = api
                .delete_all_records(&token, &app_token, &table_id)
                .await
                .map_err(upstream)?;
            json!({ "deleted": deleted })
        }
    };

    Ok(Json(result))
}
