//! Language-model assistance for the tracker
//!
//! This module provides:
//! - Provider configuration and the HTTP chat client
//! - Knowledge extraction, question generation and answer grading through a model
//! - Deterministic local heuristics used when the model call fails
//! - A bounded log of model calls

pub mod assistant;
pub mod call_log;
pub mod client;
pub mod config;
pub mod fallback;
pub mod heuristic;
pub mod tasks;

use thiserror::Error;

use crate::storage::StoreError;

pub use assistant::StudyAssistant;
pub use call_log::{CallLog, CallLogEntry, MAX_CALL_LOG_ENTRIES};
pub use client::{ChatModel, HttpChatModel};
pub use config::{AiConfig, Provider};
pub use fallback::{with_fallback, Source, Sourced};
pub use tasks::{Grade, Tutor, MIN_ANSWER_CHARS};

#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI provider not configured: {0}")]
    ConfigurationMissing(String),

    #[error("Remote API error {status}: {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Could not parse model response: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AiError {
    /// Errors after which the local heuristic takes over
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AiError::RemoteApi { .. } | AiError::Parse(_) | AiError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AiError>;
