//! Front door for AI features: model first, local heuristic on failure

use std::sync::Arc;

use super::client::HttpChatModel;
use super::config::AiConfig;
use super::fallback::{with_fallback, Sourced};
use super::heuristic;
use super::tasks::{validate_answer, Grade, Tutor};
use super::Result;
use crate::storage::{KeyValueStore, KnowledgePoint, NewKnowledgePoint};

pub struct StudyAssistant {
    tutor: Option<Tutor>,
}

impl StudyAssistant {
    pub fn new(tutor: Tutor) -> Self {
        Self { tutor: Some(tutor) }
    }

    /// Heuristics only, no model calls
    pub fn offline() -> Self {
        Self { tutor: None }
    }

    /// Build from the provider config stored in `backend`, logging calls to the same store.
    ///
    /// Fails with `ConfigurationMissing` when no API key is available.
    pub fn from_backend(backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let config = AiConfig::load(backend.as_ref())?.with_env_overrides();
        let model = HttpChatModel::new(config)?;
        Ok(Self::new(Tutor::new(Arc::new(model)).with_call_log(backend)))
    }

    pub fn is_offline(&self) -> bool {
        self.tutor.is_none()
    }

    pub async fn extract_knowledge_points(
        &self,
        title: &str,
        content: &str,
    ) -> Result<Sourced<Vec<NewKnowledgePoint>>> {
        match &self.tutor {
            Some(tutor) => {
                with_fallback(tutor.extract_knowledge_points(title, content), || {
                    heuristic::extract_knowledge_points(title, content)
                })
                .await
            }
            None => Ok(Sourced::heuristic(heuristic::extract_knowledge_points(
                title, content,
            ))),
        }
    }

    pub async fn generate_question(&self, point: &KnowledgePoint) -> Result<Sourced<String>> {
        match &self.tutor {
            Some(tutor) => {
                with_fallback(tutor.generate_question(point), || {
                    heuristic::generate_question(point)
                })
                .await
            }
            None => Ok(Sourced::heuristic(heuristic::generate_question(point))),
        }
    }

    pub async fn grade_answer(
        &self,
        point: &KnowledgePoint,
        question: &str,
        answer: &str,
    ) -> Result<Sourced<Grade>> {
        validate_answer(answer)?;
        match &self.tutor {
            Some(tutor) => {
                with_fallback(tutor.grade_answer(point, question, answer), || {
                    heuristic::grade_answer(point, answer)
                })
                .await
            }
            None => Ok(Sourced::heuristic(heuristic::grade_answer(point, answer))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::ChatModel;
    use crate::ai::fallback::Source;
    use crate::ai::{AiError, CallLog};
    use crate::storage::MemoryBackend;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        fn provider(&self) -> String {
            "fake".into()
        }

        fn model(&self) -> String {
            "fake-1".into()
        }

        async fn complete(&self, _: &str, _: &str) -> Result<String> {
            Err(AiError::RemoteApi {
                status: 502,
                message: "bad gateway".into(),
            })
        }
    }

    struct GarbledModel;

    #[async_trait]
    impl ChatModel for GarbledModel {
        fn provider(&self) -> String {
            "fake".into()
        }

        fn model(&self) -> String {
            "fake-1".into()
        }

        async fn complete(&self, _: &str, _: &str) -> Result<String> {
            Ok("I cannot answer that in JSON, sorry.".into())
        }
    }

    fn point() -> KnowledgePoint {
        KnowledgePoint::new(
            Uuid::new_v4(),
            "Borrowing".into(),
            "references borrow values without taking ownership".into(),
        )
    }

    #[tokio::test]
    async fn test_remote_failure_uses_heuristic() {
        let backend = Arc::new(MemoryBackend::new());
        let assistant =
            StudyAssistant::new(Tutor::new(Arc::new(DownModel)).with_call_log(backend.clone()));

        let points = assistant
            .extract_knowledge_points("Rust", "Borrowing: references without ownership")
            .await
            .unwrap();
        assert_eq!(points.source, Source::Heuristic);
        assert_eq!(points.value[0].title, "Borrowing");

        let grade = assistant
            .grade_answer(&point(), "What is borrowing?", "references borrow values")
            .await
            .unwrap();
        assert_eq!(grade.source, Source::Heuristic);

        // Failed calls are still logged
        assert_eq!(CallLog::load(backend.as_ref()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_heuristic() {
        let assistant = StudyAssistant::new(Tutor::new(Arc::new(GarbledModel)));

        let grade = assistant
            .grade_answer(&point(), "Q", "something long enough")
            .await
            .unwrap();
        assert_eq!(grade.source, Source::Heuristic);

        let question = assistant.generate_question(&point()).await.unwrap();
        assert_eq!(question.source, Source::Model);
    }

    #[tokio::test]
    async fn test_short_answer_is_rejected_offline() {
        let assistant = StudyAssistant::offline();
        assert!(assistant.is_offline());

        let result = assistant.grade_answer(&point(), "Q", "ok").await;
        assert!(matches!(result, Err(AiError::Validation(_))));
    }

    #[test]
    fn test_model_requires_key() {
        let config = AiConfig {
            api_key: "   ".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpChatModel::new(config),
            Err(AiError::ConfigurationMissing(_))
        ));

        let config = AiConfig {
            api_key: "sk-test".into(),
            ..Default::default()
        };
        assert!(HttpChatModel::new(config).is_ok());
    }
}
