use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StoreError};
use crate::tables::AppCredentials;

/// Storage key of the sync configuration
pub const SYNC_CONFIG_KEY: &str = "sync_config";

/// Default quiet period before local writes are pushed
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_secs(5);

/// Remote table sync configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Whether local writes are mirrored to the remote table
    #[serde(default)]
    pub enabled: bool,
    /// Open platform app id
    #[serde(default)]
    pub app_id: String,
    /// Open platform app secret
    #[serde(default)]
    pub app_secret: String,
    /// Token of the multi-dimensional table app holding the table
    #[serde(default)]
    pub app_token: String,
    /// Table receiving one record per knowledge point
    #[serde(default)]
    pub table_id: String,
    /// Quiet period in seconds before a push
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_delay_secs() -> u64 {
    DEFAULT_SYNC_DELAY.as_secs()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            app_id: String::new(),
            app_secret: String::new(),
            app_token: String::new(),
            table_id: String::new(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl SyncConfig {
    /// Load from the key-value store, defaulting when absent or unreadable
    pub fn load(backend: &dyn KeyValueStore) -> Result<Self, StoreError> {
        let Some(raw) = backend.read(SYNC_CONFIG_KEY)? else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Sync: stored sync config is unreadable ({}), using defaults", e);
            Self::default()
        }))
    }

    pub fn save(&self, backend: &dyn KeyValueStore) -> Result<(), StoreError> {
        backend.write(SYNC_CONFIG_KEY, &serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Enabled and every identifier filled in
    pub fn is_complete(&self) -> bool {
        self.enabled
            && [&self.app_id, &self.app_secret, &self.app_token, &self.table_id]
                .iter()
                .all(|v| !v.trim().is_empty())
    }

    pub fn credentials(&self) -> AppCredentials {
        AppCredentials::new(self.app_id.clone(), self.app_secret.clone())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_load_defaults_when_missing() {
        let backend = MemoryBackend::new();
        let config = SyncConfig::load(&backend).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.delay(), DEFAULT_SYNC_DELAY);
        assert!(!config.is_complete());
    }

    #[test]
    fn test_save_and_load() {
        let backend = MemoryBackend::new();
        let config = SyncConfig {
            enabled: true,
            app_id: "cli_a".into(),
            app_secret: "secret".into(),
            app_token: "bascn".into(),
            table_id: "tbl".into(),
            delay_secs: 2,
        };
        config.save(&backend).unwrap();

        let loaded = SyncConfig::load(&backend).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.is_complete());
    }

    #[test]
    fn test_partial_config_is_incomplete() {
        let backend = MemoryBackend::new();
        backend
            .write(SYNC_CONFIG_KEY, r#"{"enabled": true, "appId": "cli_a"}"#)
            .unwrap();
        let config = SyncConfig::load(&backend).unwrap();
        assert!(config.enabled);
        assert_eq!(config.delay_secs, 5);
        assert!(!config.is_complete());
    }
}
