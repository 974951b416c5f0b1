//! External sync of the learning document
//!
//! Local writes are the source of truth. After every save the store hands the new
//! snapshot to a [`SyncNotifier`]; the debouncer coalesces bursts of writes and pushes
//! the latest snapshot to a [`SyncTarget`] once writes go quiet. Pushes are best-effort.

pub mod config;
pub mod debounce;
pub mod table;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::LearningData;
use crate::tables::TableError;

pub use config::{SyncConfig, DEFAULT_SYNC_DELAY, SYNC_CONFIG_KEY};
pub use debounce::{start_debounced_sync, SyncDebouncer};
pub use table::TableSync;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Sync not configured: {0}")]
    NotConfigured(String),
}

/// Outcome of one push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub deleted: usize,
    pub created: usize,
}

/// Receives every saved document. Must not block.
pub trait SyncNotifier: Send + Sync {
    fn notify(&self, data: &LearningData);
}

/// Remote destination of a push
#[async_trait]
pub trait SyncTarget: Send + Sync {
    fn name(&self) -> &str;

    async fn push(&self, data: &LearningData) -> Result<SyncReport, SyncError>;
}
