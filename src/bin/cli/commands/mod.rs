pub mod add;
pub mod backup;
pub mod config;
pub mod due;
pub mod log;
pub mod points;
pub mod quiz;
pub mod stats;
pub mod sync;
pub mod topics;
