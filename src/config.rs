//! Proxy server configuration
//!
//! Read from a TOML file (all keys optional), then overridden by `STUDYMATE_*`
//! environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tables::{AppCredentials, DEFAULT_BASE_URL};

pub const BIND_ENV: &str = "STUDYMATE_BIND";
pub const UPSTREAM_URL_ENV: &str = "STUDYMATE_UPSTREAM_URL";
pub const APP_ID_ENV: &str = "STUDYMATE_APP_ID";
pub const APP_SECRET_ENV: &str = "STUDYMATE_APP_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8787`
    pub bind: String,
    /// Open platform API root
    pub upstream_base_url: String,
    /// App used for the OAuth code exchange
    pub app_id: String,
    pub app_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            upstream_base_url: DEFAULT_BASE_URL.to_string(),
            app_id: String::new(),
            app_secret: String::new(),
        }
    }
}

impl ServerConfig {
    /// `<config dir>/studymate/server.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("studymate").join("server.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load from `path`, or from the default path when it exists, else defaults.
    /// Environment overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    log::info!("Config: reading {:?}", path);
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };

        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the environment in production)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = non_empty(BIND_ENV) {
            self.bind = bind;
        }
        if let Some(url) = non_empty(UPSTREAM_URL_ENV) {
            self.upstream_base_url = url;
        }
        if let Some(app_id) = non_empty(APP_ID_ENV) {
            self.app_id = app_id;
        }
        if let Some(app_secret) = non_empty(APP_SECRET_ENV) {
            self.app_secret = app_secret;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if !(self.upstream_base_url.starts_with("http://")
            || self.upstream_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "upstream_base_url must be an http(s) URL, got '{}'",
                self.upstream_base_url
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::Validation(format!("bad bind address '{}': {}", self.bind, e)))
    }

    /// OAuth app credentials, if both halves are configured
    pub fn oauth_credentials(&self) -> Option<AppCredentials> {
        let credentials = AppCredentials::new(self.app_id.trim(), self.app_secret.trim());
        credentials.validate().ok().map(|_| credentials)
    }
}
