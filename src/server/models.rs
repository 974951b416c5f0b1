//! Request and response bodies of the proxy service

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /auth/exchange` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl ExchangeRequest {
    pub fn is_refresh(&self) -> bool {
        self.grant_type.as_deref() == Some("refresh_token")
    }
}

/// `POST /table-proxy` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProxyRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub app_token: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Operations accepted by `/table-proxy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyAction {
    GetToken,
    TestConnection,
    ListTables,
    CreateTable,
    ListRecords,
    BatchCreate,
    DeleteAllRecords,
}

impl ProxyAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "getToken" => Some(Self::GetToken),
            "testConnection" => Some(Self::TestConnection),
            "listTables" => Some(Self::ListTables),
            "createTable" => Some(Self::CreateTable),
            "listRecords" => Some(Self::ListRecords),
            "batchCreate" => Some(Self::BatchCreate),
            "deleteAllRecords" => Some(Self::DeleteAllRecords),
            _ => None,
        }
    }

    pub fn needs_app_token(self) -> bool {
        self != Self::GetToken
    }

    pub fn needs_table_id(self) -> bool {
        matches!(
            self,
            Self::ListRecords | Self::BatchCreate | Self::DeleteAllRecords
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
