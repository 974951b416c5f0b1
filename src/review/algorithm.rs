//! Fixed-ladder review scheduling
//!
//! The interval grows along a fixed ladder of days indexed by how often a point has been
//! reviewed. A weak last score shortens the interval:
//! - score < 60: half the ladder interval
//! - score < 80: three quarters of the ladder interval
//! - otherwise: the ladder interval unchanged
//!
//! Intervals are floored and never shorter than one day.

use chrono::{DateTime, Duration, Utc};

use crate::storage::{KnowledgePoint, LearningData};

/// Review intervals in days, indexed by `review_count - 1`
pub const INTERVAL_LADDER: [i64; 6] = [1, 3, 7, 14, 30, 60];

/// Scores below this halve the interval
const WEAK_SCORE: i64 = 60;

/// Scores below this shorten the interval to three quarters
const SHAKY_SCORE: i64 = 80;

/// Interval in days before the next review
///
/// `review_count` counts the practice being scheduled; zero or negative counts use the
/// first rung of the ladder.
pub fn interval_days(review_count: i64, score: i64) -> i64 {
    let index = (review_count - 1).clamp(0, INTERVAL_LADDER.len() as i64 - 1) as usize;
    let base = INTERVAL_LADDER[index];

    let interval = if score < WEAK_SCORE {
        base / 2
    } else if score < SHAKY_SCORE {
        base * 3 / 4
    } else {
        base
    };

    interval.max(1)
}

/// Timestamp of the next review, counted from `now`
pub fn next_review_date(review_count: i64, score: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(interval_days(review_count, score))
}

/// All knowledge points due at `now`, oldest due first
///
/// Points that were never practiced have no `next_review` and are never due.
pub fn due_points(data: &LearningData, now: DateTime<Utc>) -> Vec<KnowledgePoint> {
    let mut due: Vec<KnowledgePoint> = data
        .knowledge_points
        .iter()
        .filter(|kp| kp.is_due(now))
        .cloned()
        .collect();

    due.sort_by(|a, b| a.next_review.cmp(&b.next_review));
    due
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: i64) -> String {
    if days <= 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
