//! habit-correlate - Batch correlation engine for habit tracking data
//!
//! For each user, the engine measures how strongly pairs of tracked habits
//! move together over a date window, using three complementary methods:
//! Pearson linear correlation, Spearman rank correlation, and an optional
//! time-warped shape distance. Results are reconciled against the previously
//! stored snapshot with one record per unordered habit pair.
//!
//! Pipeline: series assembly → normalization → pairwise computation →
//! reconciliation. Users are processed independently.

pub mod assembler;
pub mod config;
pub mod correlation;
pub mod error;
pub mod insight;
pub mod normalizer;
pub mod pipeline;
pub mod reconciler;
pub mod shape;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use insight::{CorrelationInsight, StrengthBucket};
pub use pipeline::{BatchRunReport, CorrelationEngine, UserRunReport};
pub use shape::ShapeCapability;
pub use store::{CorrelationStore, HabitStore, MemoryStore, StoreError};
pub use types::{CorrelationResult, DateWindow, Habit, HabitId, Observation, UserId};

/// Engine version embedded in CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
