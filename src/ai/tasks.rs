//! Study tasks performed by a chat model

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::call_log::{CallLog, CallLogEntry};
use super::client::ChatModel;
use super::heuristic::MAX_EXTRACTED_POINTS;
use super::{AiError, Result};
use crate::storage::{KeyValueStore, KnowledgePoint, NewKnowledgePoint};

/// Answers shorter than this (trimmed, in characters) are rejected before grading
pub const MIN_ANSWER_CHARS: usize = 3;

const EXTRACT_SYSTEM_PROMPT: &str = "You are a study assistant. Break the learning material \
into atomic knowledge points. Reply with JSON only: an array of objects with \"title\" \
(a short name) and \"description\" (one or two sentences). At most 8 items.";

const QUESTION_SYSTEM_PROMPT: &str = "You are a tutor writing practice questions. Ask exactly \
one open question that checks understanding of the given knowledge point. Reply with JSON \
only: {\"question\": \"...\"}.";

const GRADE_SYSTEM_PROMPT: &str = "You are a strict but fair tutor. Grade the student's \
answer to the question about the knowledge point. Reply with JSON only: \
{\"score\": <integer 0-100>, \"feedback\": \"<one or two sentences>\"}.";

/// Result of grading an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub score: u8,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
struct QuestionReply {
    question: String,
}

#[derive(Debug, Deserialize)]
struct GradeReply {
    score: Value,
    #[serde(default)]
    feedback: String,
}

/// Reject answers too short to grade
pub fn validate_answer(answer: &str) -> Result<()> {
    if answer.trim().chars().count() < MIN_ANSWER_CHARS {
        return Err(AiError::Validation(format!(
            "answer must be at least {} characters",
            MIN_ANSWER_CHARS
        )));
    }
    Ok(())
}

/// Runs study tasks against a model and records each call
pub struct Tutor {
    model: Arc<dyn ChatModel>,
    call_log: Option<Arc<dyn KeyValueStore>>,
}

impl Tutor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            call_log: None,
        }
    }

    /// Append every call to the log stored in `backend`
    pub fn with_call_log(mut self, backend: Arc<dyn KeyValueStore>) -> Self {
        self.call_log = Some(backend);
        self
    }

    pub async fn extract_knowledge_points(
        &self,
        title: &str,
        content: &str,
    ) -> Result<Vec<NewKnowledgePoint>> {
        let prompt = format!("Title: {}\n\nMaterial:\n{}", title, content);
        let reply = self.call("extract", EXTRACT_SYSTEM_PROMPT, &prompt).await?;
        parse_knowledge_points(&reply)
    }

    pub async fn generate_question(&self, point: &KnowledgePoint) -> Result<String> {
        let prompt = format!(
            "Knowledge point: {}\nDescription: {}",
            point.title, point.description
        );
        let reply = self.call("question", QUESTION_SYSTEM_PROMPT, &prompt).await?;
        parse_question(&reply)
    }

    pub async fn grade_answer(
        &self,
        point: &KnowledgePoint,
        question: &str,
        answer: &str,
    ) -> Result<Grade> {
        validate_answer(answer)?;
        let prompt = format!(
            "Knowledge point: {}\nDescription: {}\n\nQuestion: {}\n\nStudent answer: {}",
            point.title, point.description, question, answer
        );
        let reply = self.call("grade", GRADE_SYSTEM_PROMPT, &prompt).await?;
        parse_grade(&reply)
    }

    async fn call(&self, task: &str, system: &str, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let result = self.model.complete(system, prompt).await;

        if let Some(backend) = &self.call_log {
            CallLog::append(
                backend.as_ref(),
                CallLogEntry {
                    at: Utc::now(),
                    provider: self.model.provider(),
                    model: self.model.model(),
                    task: task.to_string(),
                    ok: result.is_ok(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    error: result.as_ref().err().map(|e| e.to_string()),
                },
            );
        }

        if let Err(e) = &result {
            log::warn!("AI: {} call failed: {}", task, e);
        }
        result
    }
}

/// Pull the JSON payload out of a model reply that may be wrapped in prose or code fences
pub fn extract_json(reply: &str) -> Result<Value> {
    let text = reply.trim();
    let start = text
        .find(['[', '{'])
        .ok_or_else(|| AiError::Parse("no JSON in model reply".to_string()))?;
    let end = text
        .rfind([']', '}'])
        .filter(|end| *end > start)
        .ok_or_else(|| AiError::Parse("no JSON in model reply".to_string()))?;

    serde_json::from_str(&text[start..=end]).map_err(|e| AiError::Parse(e.to_string()))
}

fn parse_knowledge_points(reply: &str) -> Result<Vec<NewKnowledgePoint>> {
    let value = extract_json(reply)?;
    // Accept a bare array or an object wrapping one
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map
            .remove("knowledgePoints")
            .or_else(|| map.remove("knowledge_points"))
            .or_else(|| map.remove("points"))
        {
            Some(Value::Array(items)) => items,
            _ => return Err(AiError::Parse("expected an array of knowledge points".into())),
        },
        _ => return Err(AiError::Parse("expected an array of knowledge points".into())),
    };

    let mut seen = HashSet::new();
    let points: Vec<NewKnowledgePoint> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<NewKnowledgePoint>(item).ok())
        .map(|p| NewKnowledgePoint {
            title: p.title.trim().to_string(),
            description: p.description.trim().to_string(),
        })
        .filter(|p| !p.title.is_empty() && seen.insert(p.title.to_lowercase()))
        .take(MAX_EXTRACTED_POINTS)
        .collect();

    if points.is_empty() {
        return Err(AiError::Parse("model returned no knowledge points".into()));
    }
    Ok(points)
}

fn parse_question(reply: &str) -> Result<String> {
    let question = match extract_json(reply)
        .ok()
        .and_then(|v| serde_json::from_value::<QuestionReply>(v).ok())
    {
        Some(parsed) => parsed.question,
        // Plain-text replies are usable as they are
        None => reply.trim().trim_matches('"').to_string(),
    };

    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(AiError::Parse("model returned an empty question".into()));
    }
    Ok(question)
}

fn parse_grade(reply: &str) -> Result<Grade> {
    let parsed: GradeReply = serde_json::from_value(extract_json(reply)?)
        .map_err(|e| AiError::Parse(e.to_string()))?;

    let score = match &parsed.score {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .ok_or_else(|| AiError::Parse(format!("invalid score: {}", parsed.score)))?;

    Ok(Grade {
        score: score.round().clamp(0.0, 100.0) as u8,
        feedback: parsed.feedback.trim().to_string(),
    })
}
