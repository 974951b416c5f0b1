//! Bounded log of model calls, newest last

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::backend::AI_CALL_LOG_KEY;
use crate::storage::{KeyValueStore, StoreError};

/// Oldest entries are dropped beyond this
pub const MAX_CALL_LOG_ENTRIES: usize = 100;

/// A single model call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    pub at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    /// What the call was for (extract, question, grade)
    pub task: String,
    pub ok: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallLog {
    entries: VecDeque<CallLogEntry>,
}

impl CallLog {
    pub fn push(&mut self, entry: CallLogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > MAX_CALL_LOG_ENTRIES {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CallLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load from the key-value store; an unreadable log starts over empty
    pub fn load(backend: &dyn KeyValueStore) -> Result<Self, StoreError> {
        let Some(raw) = backend.read(AI_CALL_LOG_KEY)? else {
            return Ok(Self::default());
        };
        let mut log: CallLog = serde_json::from_str(&raw).unwrap_or_default();
        // Trim logs written with a larger bound
        while log.entries.len() > MAX_CALL_LOG_ENTRIES {
            log.entries.pop_front();
        }
        Ok(log)
    }

    pub fn save(&self, backend: &dyn KeyValueStore) -> Result<(), StoreError> {
        backend.write(AI_CALL_LOG_KEY, &serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Append one entry to the stored log. Failures are logged and swallowed.
    pub fn append(backend: &dyn KeyValueStore, entry: CallLogEntry) {
        let result = Self::load(backend).and_then(|mut log| {
            log.push(entry);
            log.save(backend)
        });
        if let Err(e) = result {
            log::warn!("AI: could not update call log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn entry(task: &str) -> CallLogEntry {
        CallLogEntry {
            at: Utc::now(),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            task: task.into(),
            ok: true,
            duration_ms: 12,
            error: None,
        }
    }

    #[test]
    fn test_ring_buffer_keeps_newest() {
        let mut log = CallLog::default();
        for i in 0..(MAX_CALL_LOG_ENTRIES + 20) {
            log.push(entry(&format!("task-{}", i)));
        }

        assert_eq!(log.len(), MAX_CALL_LOG_ENTRIES);
        assert_eq!(log.entries().next().unwrap().task, "task-20");
        assert_eq!(log.entries().last().unwrap().task, "task-119");
    }

    #[test]
    fn test_append_persists() {
        let backend = MemoryBackend::new();
        CallLog::append(&backend, entry("extract"));
        CallLog::append(&backend, entry("grade"));

        let log = CallLog::load(&backend).unwrap();
        let tasks: Vec<&str> = log.entries().map(|e| e.task.as_str()).collect();
        assert_eq!(tasks, vec!["extract", "grade"]);

        let raw = backend.read(AI_CALL_LOG_KEY).unwrap().unwrap();
        assert!(raw.starts_with('['));
    }

    #[test]
    fn test_load_trims_oversized_log() {
        let backend = MemoryBackend::new();
        let oversized: Vec<CallLogEntry> = (0..150).map(|i| entry(&i.to_string())).collect();
        backend
            .write(AI_CALL_LOG_KEY, &serde_json::to_string(&oversized).unwrap())
            .unwrap();

        let log = CallLog::load(&backend).unwrap();
        assert_eq!(log.len(), MAX_CALL_LOG_ENTRIES);
        assert_eq!(log.entries().next().unwrap().task, "50");
    }
}
