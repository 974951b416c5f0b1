//! Primary/secondary strategy combinator

use std::fmt;
use std::future::Future;

use serde::Serialize;

use super::Result;

/// Which strategy produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Model,
    Heuristic,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Model => f.write_str("model"),
            Source::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// A value tagged with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Sourced<T> {
    pub fn model(value: T) -> Self {
        Self {
            value,
            source: Source::Model,
        }
    }

    pub fn heuristic(value: T) -> Self {
        Self {
            value,
            source: Source::Heuristic,
        }
    }
}

/// Await `primary`; on a recoverable error run `fallback` instead.
///
/// Configuration and validation errors are returned unchanged.
pub async fn with_fallback<T, Fut, F>(primary: Fut, fallback: F) -> Result<Sourced<T>>
where
    Fut: Future<Output = Result<T>>,
    F: FnOnce() -> T,
{
    match primary.await {
        Ok(value) => Ok(Sourced::model(value)),
        Err(e) if e.is_recoverable() => {
            log::warn!("AI: falling back to local heuristic after error: {}", e);
            Ok(Sourced::heuristic(fallback()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;

    #[tokio::test]
    async fn test_success_keeps_primary() {
        let result = with_fallback(async { Ok(1) }, || 2).await.unwrap();
        assert_eq!(result, Sourced::model(1));
    }

    #[tokio::test]
    async fn test_recoverable_errors_fall_back() {
        let remote = with_fallback(
            async {
                Err(AiError::RemoteApi {
                    status: 503,
                    message: "overloaded".into(),
                })
            },
            || "local",
        )
        .await
        .unwrap();
        assert_eq!(remote, Sourced::heuristic("local"));

        let parse = with_fallback(async { Err(AiError::Parse("bad".into())) }, || 7)
            .await
            .unwrap();
        assert_eq!(parse.source, Source::Heuristic);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let missing =
            with_fallback(async { Err::<u8, _>(AiError::ConfigurationMissing("key".into())) }, || 0)
                .await;
        assert!(matches!(missing, Err(AiError::ConfigurationMissing(_))));

        let invalid = with_fallback(async { Err::<u8, _>(AiError::Validation("short".into())) }, || 0)
            .await;
        assert!(matches!(invalid, Err(AiError::Validation(_))));
    }
}
