//! Key-value persistence port
//!
//! Everything the tracker persists lives under a handful of keys, each holding one
//! serialized JSON blob:
//! ```text
//! {data_dir}/
//! ├── learning_data.json   # The learning document (topics, points, practices, ...)
//! ├── ai_config.json       # AI provider configuration
//! └── ai_call_log.json     # Bounded log of model calls
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Key of the learning document
pub const LEARNING_DATA_KEY: &str = "learning_data";
/// Key of the AI provider configuration
pub const AI_CONFIG_KEY: &str = "ai_config";
/// Key of the model call log
pub const AI_CALL_LOG_KEY: &str = "ai_call_log";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Backend lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Persistence port injected into the store and the AI settings
///
/// `write` replaces the whole value for a key in a single operation.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a data directory
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("studymate"))
            .ok_or(BackendError::DataDirNotFound)
    }

    /// Initialize the data directory
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Atomic write (write to .tmp then rename)
    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.base_path)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// In-memory backend, used by tests and dry runs
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| BackendError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| BackendError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
