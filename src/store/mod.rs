//! Persistence layer: task configuration and per-item-type match tables.

pub mod match_store;
pub mod task_store;

pub use match_store::MatchStore;
pub use task_store::TaskStore;
