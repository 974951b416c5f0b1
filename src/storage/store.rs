//! The learning store
//!
//! Every mutation reads the whole document, applies one change plus its cascade,
//! recomputes the derived fields (mastery, next review, daily log, streak) and writes the
//! whole document back with a single `write`. After each write the sync notifier, if any,
//! receives the new snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::backend::{BackendError, KeyValueStore, LEARNING_DATA_KEY};
use super::models::*;
use crate::review::{due_points, next_review_date, record_activity};
use crate::sync::SyncNotifier;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(#[from] BackendError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Topic not found: {0}")]
    TopicNotFound(Uuid),

    #[error("Knowledge point not found: {0}")]
    KnowledgePointNotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Mastery at or above this counts as mastered in the statistics
pub const MASTERED_THRESHOLD: u8 = 80;

/// Store for topics, knowledge points and practices
pub struct LearningStore {
    backend: Arc<dyn KeyValueStore>,
    notifier: Option<Arc<dyn SyncNotifier>>,
}

impl LearningStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            notifier: None,
        }
    }

    /// Attach a notifier that receives every saved document
    pub fn with_notifier(mut self, notifier: Arc<dyn SyncNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    // ==================== Document ====================

    /// Load the full document
    ///
    /// Missing fields are back-filled with defaults. A document that no longer parses is
    /// discarded and the default empty document returned in its place.
    pub fn get_all(&self) -> Result<LearningData> {
        let Some(raw) = self.backend.read(LEARNING_DATA_KEY)? else {
            return Ok(LearningData::default());
        };

        match serde_json::from_str::<LearningData>(&raw) {
            Ok(data) => Ok(data),
            Err(e) => {
                log::warn!(
                    "Store: stored document is unreadable ({}), starting from an empty document",
                    e
                );
                Ok(LearningData::default())
            }
        }
    }

    /// Persist the full document and notify the sync layer
    pub fn save_all(&self, data: &LearningData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        self.backend.write(LEARNING_DATA_KEY, &json)?;

        if let Some(notifier) = &self.notifier {
            notifier.notify(data);
        }
        Ok(())
    }

    // ==================== Topic Operations ====================

    /// Create a topic from submitted material
    pub fn add_topic(&self, title: &str, content: &str) -> Result<Topic> {
        self.add_topic_with_points(title, content, Vec::new())
            .map(|(topic, _)| topic)
    }

    /// Create a topic together with its extracted knowledge points in one write
    pub fn add_topic_with_points(
        &self,
        title: &str,
        content: &str,
        points: Vec<NewKnowledgePoint>,
    ) -> Result<(Topic, Vec<KnowledgePoint>)> {
        let mut data = self.get_all()?;

        let title = validate_title(title)?;
        ensure_unique_topic_title(&data, &title, None)?;

        let mut topic = Topic::new(title, content.to_string());
        let mut created = Vec::with_capacity(points.len());
        for point in points {
            let kp = build_knowledge_point(&data, &created, topic.id, point)?;
            topic.knowledge_point_ids.push(kp.id);
            created.push(kp);
        }

        data.topics.push(topic.clone());
        data.knowledge_points.extend(created.iter().cloned());
        record_activity(&mut data, today());

        self.save_all(&data)?;
        log::info!(
            "Store: added topic {} with {} knowledge point(s)",
            topic.id,
            created.len()
        );
        Ok((topic, created))
    }

    /// Get a topic by ID
    pub fn get_topic(&self, id: Uuid) -> Result<Topic> {
        self.get_all()?
            .topics
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::TopicNotFound(id))
    }

    /// Update a topic's title or content
    pub fn update_topic(&self, id: Uuid, updates: UpdateTopicRequest) -> Result<Topic> {
        let mut data = self.get_all()?;

        let title = match updates.title {
            Some(title) => {
                let title = validate_title(&title)?;
                ensure_unique_topic_title(&data, &title, Some(id))?;
                Some(title)
            }
            None => None,
        };

        let topic = data
            .topics
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TopicNotFound(id))?;

        if let Some(title) = title {
            topic.title = title;
        }
        if let Some(content) = updates.content {
            topic.content = content;
        }

        let updated = topic.clone();
        self.save_all(&data)?;
        Ok(updated)
    }

    /// Delete a topic with its knowledge points and their practices
    pub fn delete_topic(&self, id: Uuid) -> Result<()> {
        let mut data = self.get_all()?;

        let len_before = data.topics.len();
        data.topics.retain(|t| t.id != id);
        if data.topics.len() == len_before {
            return Err(StoreError::TopicNotFound(id));
        }

        let removed: HashSet<Uuid> = data
            .knowledge_points
            .iter()
            .filter(|kp| kp.topic_id == id)
            .map(|kp| kp.id)
            .collect();
        remove_points(&mut data, &removed);

        self.save_all(&data)?;
        log::info!(
            "Store: deleted topic {} and {} knowledge point(s)",
            id,
            removed.len()
        );
        Ok(())
    }

    // ==================== Knowledge Point Operations ====================

    /// Add a knowledge point to an existing topic
    pub fn add_knowledge_point(
        &self,
        topic_id: Uuid,
        point: NewKnowledgePoint,
    ) -> Result<KnowledgePoint> {
        let mut data = self.get_all()?;

        if data.topic(topic_id).is_none() {
            return Err(StoreError::TopicNotFound(topic_id));
        }
        let kp = build_knowledge_point(&data, &[], topic_id, point)?;

        if let Some(topic) = data.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.knowledge_point_ids.push(kp.id);
        }
        data.knowledge_points.push(kp.clone());

        self.save_all(&data)?;
        Ok(kp)
    }

    /// Knowledge points of one topic, in creation order
    pub fn knowledge_points_for(&self, topic_id: Uuid) -> Result<Vec<KnowledgePoint>> {
        let data = self.get_all()?;
        if data.topic(topic_id).is_none() {
            return Err(StoreError::TopicNotFound(topic_id));
        }
        Ok(data
            .knowledge_points
            .into_iter()
            .filter(|kp| kp.topic_id == topic_id)
            .collect())
    }

    /// Get a knowledge point by ID
    pub fn get_knowledge_point(&self, id: Uuid) -> Result<KnowledgePoint> {
        self.get_all()?
            .knowledge_points
            .into_iter()
            .find(|kp| kp.id == id)
            .ok_or(StoreError::KnowledgePointNotFound(id))
    }

    /// Update a knowledge point's title or description
    pub fn update_knowledge_point(
        &self,
        id: Uuid,
        updates: UpdateKnowledgePointRequest,
    ) -> Result<KnowledgePoint> {
        let mut data = self.get_all()?;

        let topic_id = data
            .knowledge_point(id)
            .map(|kp| kp.topic_id)
            .ok_or(StoreError::KnowledgePointNotFound(id))?;

        let title = match updates.title {
            Some(title) => {
                let title = validate_title(&title)?;
                ensure_unique_point_title(&data, &[], topic_id, &title, Some(id))?;
                Some(title)
            }
            None => None,
        };

        let kp = data
            .knowledge_points
            .iter_mut()
            .find(|kp| kp.id == id)
            .ok_or(StoreError::KnowledgePointNotFound(id))?;

        if let Some(title) = title {
            kp.title = title;
        }
        if let Some(description) = updates.description {
            kp.description = description;
        }

        let updated = kp.clone();
        self.save_all(&data)?;
        Ok(updated)
    }

    /// Delete a knowledge point and its practices
    pub fn delete_knowledge_point(&self, id: Uuid) -> Result<()> {
        let mut data = self.get_all()?;

        if data.knowledge_point(id).is_none() {
            return Err(StoreError::KnowledgePointNotFound(id));
        }
        remove_points(&mut data, &HashSet::from([id]));

        self.save_all(&data)?;
        Ok(())
    }

    // ==================== Practice Operations ====================

    /// Record a practice attempt and reschedule its knowledge point
    pub fn add_practice(&self, practice: NewPractice) -> Result<Practice> {
        self.add_practice_at(practice, Utc::now())
    }

    pub(crate) fn add_practice_at(
        &self,
        practice: NewPractice,
        now: DateTime<Utc>,
    ) -> Result<Practice> {
        let mut data = self.get_all()?;

        let score = practice.score.min(100);
        let kp = data
            .knowledge_points
            .iter_mut()
            .find(|kp| kp.id == practice.knowledge_point_id)
            .ok_or(StoreError::KnowledgePointNotFound(practice.knowledge_point_id))?;

        kp.review_count += 1;
        kp.mastery = score;
        kp.last_review = Some(now);
        let next = next_review_date(i64::from(kp.review_count), i64::from(score), now);
        kp.next_review = Some(next);

        let schedule = ScheduledReview {
            knowledge_point_id: kp.id,
            due_at: next,
            review_count: kp.review_count,
        };
        data.review_schedule
            .retain(|s| s.knowledge_point_id != schedule.knowledge_point_id);
        data.review_schedule.push(schedule);

        let recorded = Practice {
            id: Uuid::new_v4(),
            knowledge_point_id: practice.knowledge_point_id,
            question: practice.question,
            answer: practice.answer,
            score,
            feedback: practice.feedback,
            created_at: now,
        };
        data.practices.push(recorded.clone());
        record_activity(&mut data, today());

        self.save_all(&data)?;
        log::debug!(
            "Store: practice on {} scored {}, next review {}",
            recorded.knowledge_point_id,
            score,
            next
        );
        Ok(recorded)
    }

    /// Practices of one knowledge point, newest first
    pub fn practices_for(&self, knowledge_point_id: Uuid) -> Result<Vec<Practice>> {
        let mut practices: Vec<Practice> = self
            .get_all()?
            .practices
            .into_iter()
            .filter(|p| p.knowledge_point_id == knowledge_point_id)
            .collect();
        practices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(practices)
    }

    // ==================== Review Queries ====================

    /// Knowledge points due at `now`
    pub fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<KnowledgePoint>> {
        Ok(due_points(&self.get_all()?, now))
    }

    /// Aggregate statistics at `now`
    pub fn stats(&self, now: DateTime<Utc>) -> Result<LearningStats> {
        let data = self.get_all()?;

        let practiced: Vec<&KnowledgePoint> = data
            .knowledge_points
            .iter()
            .filter(|kp| kp.review_count > 0)
            .collect();
        let average_mastery = if practiced.is_empty() {
            0.0
        } else {
            practiced.iter().map(|kp| kp.mastery as f32).sum::<f32>() / practiced.len() as f32
        };

        Ok(LearningStats {
            total_topics: data.topics.len(),
            total_knowledge_points: data.knowledge_points.len(),
            total_practices: data.practices.len(),
            due_count: data.knowledge_points.iter().filter(|kp| kp.is_due(now)).count(),
            never_practiced: data.knowledge_points.len() - practiced.len(),
            mastered: practiced
                .iter()
                .filter(|kp| kp.mastery >= MASTERED_THRESHOLD)
                .count(),
            average_mastery,
            streak: data.streak,
            activity_today: data.daily_log.get(&today()).copied().unwrap_or(0),
        })
    }

    // ==================== Backup ====================

    /// Serialize the full document for backup
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.get_all()?)?)
    }

    /// Replace the document with a backup, dropping dangling references
    pub fn import_json(&self, raw: &str) -> Result<LearningData> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(StoreError::Validation(
                "backup must be a JSON object".to_string(),
            ));
        }
        let mut data: LearningData = serde_json::from_value(value)?;
        let dropped = repair_references(&mut data);
        if dropped > 0 {
            log::warn!("Store: import dropped {} dangling record(s)", dropped);
        }
        self.save_all(&data)?;
        Ok(data)
    }

    /// Replace the document with an empty one
    pub fn reset(&self) -> Result<()> {
        self.save_all(&LearningData::default())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn ensure_unique_topic_title(data: &LearningData, title: &str, except: Option<Uuid>) -> Result<()> {
    let lower = title.to_lowercase();
    let taken = data
        .topics
        .iter()
        .any(|t| Some(t.id) != except && t.title.to_lowercase() == lower);
    if taken {
        return Err(StoreError::Validation(format!(
            "a topic titled '{}' already exists",
            title
        )));
    }
    Ok(())
}

fn ensure_unique_point_title(
    data: &LearningData,
    pending: &[KnowledgePoint],
    topic_id: Uuid,
    title: &str,
    except: Option<Uuid>,
) -> Result<()> {
    let lower = title.to_lowercase();
    let taken = data
        .knowledge_points
        .iter()
        .chain(pending.iter())
        .any(|kp| kp.topic_id == topic_id && Some(kp.id) != except && kp.title.to_lowercase() == lower);
    if taken {
        return Err(StoreError::Validation(format!(
            "knowledge point '{}' already exists in this topic",
            title
        )));
    }
    Ok(())
}

fn build_knowledge_point(
    data: &LearningData,
    pending: &[KnowledgePoint],
    topic_id: Uuid,
    point: NewKnowledgePoint,
) -> Result<KnowledgePoint> {
    let title = validate_title(&point.title)?;
    ensure_unique_point_title(data, pending, topic_id, &title, None)?;
    Ok(KnowledgePoint::new(topic_id, title, point.description.trim().to_string()))
}

/// Remove knowledge points together with everything that references them
fn remove_points(data: &mut LearningData, ids: &HashSet<Uuid>) {
    data.knowledge_points.retain(|kp| !ids.contains(&kp.id));
    data.practices.retain(|p| !ids.contains(&p.knowledge_point_id));
    data.review_schedule
        .retain(|s| !ids.contains(&s.knowledge_point_id));
    for topic in &mut data.topics {
        topic.knowledge_point_ids.retain(|id| !ids.contains(id));
    }
}

/// Drop records whose owner no longer exists. Returns how many were dropped.
fn repair_references(data: &mut LearningData) -> usize {
    let before =
        data.knowledge_points.len() + data.practices.len() + data.review_schedule.len();

    let topic_ids: HashSet<Uuid> = data.topics.iter().map(|t| t.id).collect();
    data.knowledge_points
        .retain(|kp| topic_ids.contains(&kp.topic_id));

    let point_ids: HashSet<Uuid> = data.knowledge_points.iter().map(|kp| kp.id).collect();
    data.practices
        .retain(|p| point_ids.contains(&p.knowledge_point_id));
    data.review_schedule
        .retain(|s| point_ids.contains(&s.knowledge_point_id));
    for topic in &mut data.topics {
        topic.knowledge_point_ids.retain(|id| point_ids.contains(id));
    }

    // Mastery and scores are percentages
    for kp in &mut data.knowledge_points {
        kp.mastery = kp.mastery.min(100);
    }
    for practice in &mut data.practices {
        practice.score = practice.score.min(100);
    }

    before - (data.knowledge_points.len() + data.practices.len() + data.review_schedule.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{FileBackend, MemoryBackend};
    use chrono::Duration;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn create_test_store() -> (LearningStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (LearningStore::new(backend.clone()), backend)
    }

    fn point(title: &str) -> NewKnowledgePoint {
        NewKnowledgePoint {
            title: title.to_string(),
            description: format!("{} explained", title),
        }
    }

    fn practice(kp: Uuid, score: u8) -> NewPractice {
        NewPractice {
            knowledge_point_id: kp,
            question: "Explain it".to_string(),
            answer: "An answer".to_string(),
            score,
            feedback: String::new(),
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        snapshots: Mutex<Vec<usize>>,
    }

    impl SyncNotifier for CountingNotifier {
        fn notify(&self, data: &LearningData) {
            self.snapshots.lock().unwrap().push(data.topics.len());
        }
    }

    #[test]
    fn test_get_all_on_empty_backend() {
        let (store, _) = create_test_store();
        let data = store.get_all().unwrap();
        assert!(data.topics.is_empty());
        assert_eq!(data.streak, 0);
    }

    #[test]
    fn test_get_all_backfills_legacy_document() {
        let (store, backend) = create_test_store();
        backend
            .write(LEARNING_DATA_KEY, r#"{"topics": [], "practices": []}"#)
            .unwrap();

        let data = store.get_all().unwrap();
        assert_eq!(data.streak, 0);
        assert!(data.daily_log.is_empty());
        assert!(data.last_study_date.is_none());
    }

    #[test]
    fn test_get_all_keeps_records_without_created_at() {
        let (store, backend) = create_test_store();
        let topic_id = Uuid::new_v4();
        let point_id = Uuid::new_v4();
        let raw = serde_json::json!({
            "topics": [{"id": topic_id, "title": "Rust", "knowledgePointIds": [point_id]}],
            "knowledgePoints": [{"id": point_id, "topicId": topic_id, "title": "Ownership"}],
            "practices": [{
                "id": Uuid::new_v4(),
                "knowledgePointId": point_id,
                "question": "Q",
                "answer": "A",
                "score": 70
            }],
            "streak": 3
        });
        backend
            .write(LEARNING_DATA_KEY, &raw.to_string())
            .unwrap();

        let data = store.get_all().unwrap();
        assert_eq!(data.topics.len(), 1);
        assert_eq!(data.knowledge_points.len(), 1);
        assert_eq!(data.practices.len(), 1);
        assert_eq!(data.streak, 3);
    }

    #[test]
    fn test_get_all_resets_corrupt_document() {
        let (store, backend) = create_test_store();
        backend.write(LEARNING_DATA_KEY, "{not json").unwrap();

        let data = store.get_all().unwrap();
        assert!(data.topics.is_empty());
    }

    #[test]
    fn test_add_topic_with_points() {
        let (store, _) = create_test_store();
        let (topic, points) = store
            .add_topic_with_points("  Rust  ", "content", vec![point("Ownership"), point("Borrowing")])
            .unwrap();

        assert_eq!(topic.title, "Rust");
        assert_eq!(points.len(), 2);
        assert_eq!(topic.knowledge_point_ids, vec![points[0].id, points[1].id]);

        let data = store.get_all().unwrap();
        assert_eq!(data.knowledge_points.len(), 2);
        assert!(data.knowledge_points.iter().all(|kp| kp.topic_id == topic.id));
        assert!(data.knowledge_points.iter().all(|kp| kp.next_review.is_none()));
        assert_eq!(data.streak, 1);
    }

    #[test]
    fn test_topic_title_validation() {
        let (store, _) = create_test_store();
        assert!(matches!(
            store.add_topic("   ", ""),
            Err(StoreError::Validation(_))
        ));

        store.add_topic("Rust", "").unwrap();
        assert!(matches!(
            store.add_topic("rust", ""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_point_titles_rejected() {
        let (store, _) = create_test_store();
        assert!(matches!(
            store.add_topic_with_points("Rust", "", vec![point("Traits"), point("traits")]),
            Err(StoreError::Validation(_))
        ));
        // Nothing was written
        assert!(store.get_all().unwrap().topics.is_empty());

        let topic = store.add_topic("Rust", "").unwrap();
        store.add_knowledge_point(topic.id, point("Traits")).unwrap();
        assert!(matches!(
            store.add_knowledge_point(topic.id, point("TRAITS")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_add_knowledge_point_requires_topic() {
        let (store, _) = create_test_store();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.add_knowledge_point(missing, point("Orphan")),
            Err(StoreError::TopicNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_add_practice_updates_point() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();
        let kp_id = points[0].id;
        let now = Utc::now();

        store.add_practice_at(practice(kp_id, 90), now).unwrap();
        let kp = store.get_knowledge_point(kp_id).unwrap();
        assert_eq!(kp.review_count, 1);
        assert_eq!(kp.mastery, 90);
        assert_eq!(kp.next_review, Some(now + Duration::days(1)));

        store.add_practice_at(practice(kp_id, 40), now).unwrap();
        store.add_practice_at(practice(kp_id, 85), now).unwrap();
        let kp = store.get_knowledge_point(kp_id).unwrap();
        assert_eq!(kp.review_count, 3);
        assert_eq!(kp.mastery, 85);
        assert_eq!(kp.next_review, Some(now + Duration::days(7)));

        let data = store.get_all().unwrap();
        assert_eq!(data.review_schedule.len(), 1);
        assert_eq!(data.review_schedule[0].review_count, 3);
        assert_eq!(store.practices_for(kp_id).unwrap().len(), 3);
    }

    #[test]
    fn test_add_practice_clamps_score() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();

        let recorded = store.add_practice(practice(points[0].id, 250)).unwrap();
        assert_eq!(recorded.score, 100);
    }

    #[test]
    fn test_add_practice_unknown_point() {
        let (store, _) = create_test_store();
        assert!(matches!(
            store.add_practice(practice(Uuid::new_v4(), 50)),
            Err(StoreError::KnowledgePointNotFound(_))
        ));
    }

    #[test]
    fn test_practice_twice_same_day_keeps_streak() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();
        store.add_practice(practice(points[0].id, 70)).unwrap();
        store.add_practice(practice(points[0].id, 80)).unwrap();

        let data = store.get_all().unwrap();
        assert_eq!(data.streak, 1);
        assert_eq!(data.daily_log.values().sum::<u32>(), 3);
    }

    #[test]
    fn test_delete_topic_cascades() {
        let (store, _) = create_test_store();
        let (doomed, doomed_points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership"), point("Lifetimes")])
            .unwrap();
        let (kept, kept_points) = store
            .add_topic_with_points("Go", "", vec![point("Goroutines")])
            .unwrap();
        for kp in doomed_points.iter().chain(kept_points.iter()) {
            store.add_practice(practice(kp.id, 60)).unwrap();
        }

        store.delete_topic(doomed.id).unwrap();

        let data = store.get_all().unwrap();
        let doomed_ids: HashSet<Uuid> = doomed_points.iter().map(|kp| kp.id).collect();
        assert_eq!(data.topics.len(), 1);
        assert_eq!(data.topics[0].id, kept.id);
        assert!(data.knowledge_points.iter().all(|kp| kp.topic_id != doomed.id));
        assert!(data
            .practices
            .iter()
            .all(|p| !doomed_ids.contains(&p.knowledge_point_id)));
        assert!(data
            .review_schedule
            .iter()
            .all(|s| !doomed_ids.contains(&s.knowledge_point_id)));
        assert_eq!(data.practices.len(), 1);

        assert!(matches!(
            store.delete_topic(doomed.id),
            Err(StoreError::TopicNotFound(_))
        ));
    }

    #[test]
    fn test_delete_knowledge_point_cascades() {
        let (store, _) = create_test_store();
        let (topic, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership"), point("Lifetimes")])
            .unwrap();
        store.add_practice(practice(points[0].id, 60)).unwrap();

        store.delete_knowledge_point(points[0].id).unwrap();

        let topic = store.get_topic(topic.id).unwrap();
        assert_eq!(topic.knowledge_point_ids, vec![points[1].id]);
        let data = store.get_all().unwrap();
        assert!(data.practices.is_empty());
        assert!(data.review_schedule.is_empty());
    }

    #[test]
    fn test_update_topic_and_point() {
        let (store, _) = create_test_store();
        let (topic, points) = store
            .add_topic_with_points("Rust", "old", vec![point("Ownership"), point("Traits")])
            .unwrap();
        store.add_topic("Go", "").unwrap();

        let updated = store
            .update_topic(
                topic.id,
                UpdateTopicRequest {
                    title: None,
                    content: Some("new".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.content, "new");
        assert_eq!(updated.title, "Rust");

        assert!(matches!(
            store.update_topic(
                topic.id,
                UpdateTopicRequest {
                    title: Some("go".to_string()),
                    content: None,
                },
            ),
            Err(StoreError::Validation(_))
        ));

        // Renaming to its own title is allowed
        store
            .update_knowledge_point(
                points[0].id,
                UpdateKnowledgePointRequest {
                    title: Some("ownership".to_string()),
                    description: Some("Moves and drops".to_string()),
                },
            )
            .unwrap();
        assert!(matches!(
            store.update_knowledge_point(
                points[0].id,
                UpdateKnowledgePointRequest {
                    title: Some("Traits".to_string()),
                    description: None,
                },
            ),
            Err(StoreError::Validation(_))
        ));
        let kp = store.get_knowledge_point(points[0].id).unwrap();
        assert_eq!(kp.title, "ownership");
        assert_eq!(kp.description, "Moves and drops");
    }

    #[test]
    fn test_get_due_and_stats() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership"), point("Traits"), point("Macros")])
            .unwrap();
        let past = Utc::now() - Duration::days(10);
        store.add_practice_at(practice(points[0].id, 95), past).unwrap();
        store.add_practice_at(practice(points[1].id, 50), Utc::now()).unwrap();

        let now = Utc::now();
        let due = store.get_due(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, points[0].id);

        let stats = store.stats(now).unwrap();
        assert_eq!(stats.total_topics, 1);
        assert_eq!(stats.total_knowledge_points, 3);
        assert_eq!(stats.total_practices, 2);
        assert_eq!(stats.due_count, 1);
        assert_eq!(stats.never_practiced, 1);
        assert_eq!(stats.mastered, 1);
        assert!((stats.average_mastery - 72.5).abs() < f32::EPSILON);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.activity_today, 3);
    }

    #[test]
    fn test_notifier_sees_every_save() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(CountingNotifier::default());
        let store = LearningStore::new(backend).with_notifier(notifier.clone());

        store.add_topic("Rust", "").unwrap();
        store.add_topic("Go", "").unwrap();
        let _ = store.add_topic("", "");

        assert_eq!(*notifier.snapshots.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_import_drops_dangling_records() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();
        store.add_practice(practice(points[0].id, 80)).unwrap();

        let mut data = store.get_all().unwrap();
        let orphan = KnowledgePoint::new(Uuid::new_v4(), "Orphan".into(), String::new());
        data.knowledge_points.push(orphan);
        let raw = serde_json::to_string(&data).unwrap();

        let imported = store.import_json(&raw).unwrap();
        assert_eq!(imported.knowledge_points.len(), 1);
        assert_eq!(imported.practices.len(), 1);

        assert!(matches!(
            store.import_json("not json"),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn test_import_rejects_non_object_backup() {
        let (store, _) = create_test_store();
        store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();

        assert!(matches!(
            store.import_json("[]"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.import_json("42"),
            Err(StoreError::Validation(_))
        ));

        let data = store.get_all().unwrap();
        assert_eq!(data.topics.len(), 1);
        assert_eq!(data.knowledge_points.len(), 1);
    }

    #[test]
    fn test_import_clamps_percentages() {
        let (store, _) = create_test_store();
        let (_, points) = store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();
        store.add_practice(practice(points[0].id, 80)).unwrap();

        let mut data = store.get_all().unwrap();
        data.knowledge_points[0].mastery = 200;
        data.practices[0].score = 250;
        let raw = serde_json::to_string(&data).unwrap();

        let imported = store.import_json(&raw).unwrap();
        assert_eq!(imported.knowledge_points[0].mastery, 100);
        assert_eq!(imported.practices[0].score, 100);

        let stored = store.get_all().unwrap();
        assert_eq!(stored.knowledge_points[0].mastery, 100);
        assert_eq!(stored.practices[0].score, 100);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FileBackend::new(temp_dir.path().to_path_buf()));
        let store = LearningStore::new(backend.clone());
        store
            .add_topic_with_points("Rust", "", vec![point("Ownership")])
            .unwrap();

        let reopened = LearningStore::new(backend);
        let data = reopened.get_all().unwrap();
        assert_eq!(data.topics.len(), 1);
        assert_eq!(data.knowledge_points.len(), 1);

        let exported = reopened.export_json().unwrap();
        assert!(exported.contains("\"knowledgePoints\""));
        assert!(exported.contains("\"dailyLog\""));

        reopened.reset().unwrap();
        assert!(reopened.get_all().unwrap().topics.is_empty());
    }
}
