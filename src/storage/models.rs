//! Data models for the learning document

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A piece of source material the user submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub knowledge_point_ids: Vec<Uuid>,
}

impl Topic {
    pub fn new(title: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            created_at: Utc::now(),
            knowledge_point_ids: Vec::new(),
        }
    }
}

/// An atomic fact or concept extracted from a topic, tracked for mastery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Score of the most recent practice, 0-100
    #[serde(default)]
    pub mastery: u8,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    /// Never set until the point has been practiced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl KnowledgePoint {
    pub fn new(topic_id: Uuid, title: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic_id,
            title,
            description,
            mastery: 0,
            review_count: 0,
            last_review: None,
            next_review: None,
            created_at: Utc::now(),
        }
    }

    /// Check if the point is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.map_or(false, |next| next <= now)
    }
}

/// One answered question. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Practice {
    pub id: Uuid,
    pub knowledge_point_id: Uuid,
    pub question: String,
    pub answer: String,
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Latest schedule entry of a practiced knowledge point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub knowledge_point_id: Uuid,
    pub due_at: DateTime<Utc>,
    pub review_count: u32,
}

/// The whole persisted document
///
/// Every field has a default so documents written by older versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LearningData {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub knowledge_points: Vec<KnowledgePoint>,
    #[serde(default)]
    pub practices: Vec<Practice>,
    #[serde(default)]
    pub review_schedule: Vec<ScheduledReview>,
    /// Activity count per local calendar day
    #[serde(default)]
    pub daily_log: BTreeMap<NaiveDate, u32>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_study_date: Option<NaiveDate>,
}

impl LearningData {
    pub fn topic(&self, id: Uuid) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn knowledge_point(&self, id: Uuid) -> Option<&KnowledgePoint> {
        self.knowledge_points.iter().find(|k| k.id == id)
    }
}

/// Knowledge point candidate, as produced by extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewKnowledgePoint {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Request to record a practice attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPractice {
    pub knowledge_point_id: Uuid,
    pub question: String,
    pub answer: String,
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
}

/// Request to update a topic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTopicRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Request to update a knowledge point. Mastery only moves through practices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKnowledgePointRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Aggregate statistics over the document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_topics: usize,
    pub total_knowledge_points: usize,
    pub total_practices: usize,
    pub due_count: usize,
    pub never_practiced: usize,
    /// Knowledge points with mastery >= 80
    pub mastered: usize,
    /// Mean mastery over practiced points, 0 when none
    pub average_mastery: f32,
    pub streak: u32,
    pub activity_today: u32,
}
