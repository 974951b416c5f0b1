//! Personal learning tracker
//!
//! Topics and their knowledge points live in one JSON document behind a key-value
//! port. Practicing a point updates its mastery and schedules the next review on a
//! fixed interval ladder. A language model extracts points, writes questions and grades
//! answers, with deterministic local heuristics when the model is unavailable. Saved
//! documents can be mirrored to a remote table, and a small HTTP service proxies the
//! OAuth exchange and table API for browser clients.

pub mod ai;
pub mod config;
pub mod review;
pub mod server;
pub mod storage;
pub mod sync;
pub mod tables;
