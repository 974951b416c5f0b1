pub mod backend;
mod models;
mod store;

pub use backend::{BackendError, FileBackend, KeyValueStore, MemoryBackend};
pub use models::*;
pub use store::{LearningStore, StoreError, MASTERED_THRESHOLD};
