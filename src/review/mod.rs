//! Spaced repetition for knowledge points
//!
//! This module provides:
//! - The fixed interval ladder mapping (review count, last score) to the next review
//! - The due query over a document snapshot
//! - Daily activity log and streak bookkeeping

pub mod algorithm;
pub mod streak;

pub use algorithm::{due_points, format_interval, interval_days, next_review_date, INTERVAL_LADDER};
pub use streak::record_activity;
