//! Core types for the correlation engine
//!
//! This module defines the data structures that flow through each stage of the
//! batch pass: raw observations, the aligned series matrix, and the persisted
//! correlation results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tracked habit (assigned by the CRUD layer)
pub type HabitId = i64;

/// Identifier of a user (assigned by the CRUD layer)
pub type UserId = i64;

/// A tracked habit as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    /// Archived habits are excluded from correlation computation
    #[serde(default)]
    pub archived: bool,
}

/// A single per-habit-per-day observation.
///
/// The backing store guarantees at most one observation per (habit, date);
/// the engine relies on that invariant and never aggregates duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub value: f64,
}

/// Inclusive date range over which observations are considered for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, inclusive of both bounds
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Aligned per-user series matrix: habits as rows, observed dates as columns.
///
/// Cells without an observation are `None`, never zero. "Habit not tracked
/// that day" and "tracked and valued at zero" are different facts, and each
/// correlation method applies its own missing-data policy downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMatrix {
    /// Row identifiers, ascending by habit id
    pub habit_ids: Vec<HabitId>,
    /// Column dates, ascending
    pub dates: Vec<NaiveDate>,
    /// `cells[row][col]` parallel to `habit_ids` × `dates`
    pub cells: Vec<Vec<Option<f64>>>,
}

impl SeriesMatrix {
    pub fn num_habits(&self) -> usize {
        self.habit_ids.len()
    }

    pub fn num_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn row(&self, index: usize) -> &[Option<f64>] {
        &self.cells[index]
    }
}

/// Persisted correlation record for one unordered habit pair.
///
/// Canonical ordering is `habit1_id < habit2_id`, so each pair has exactly
/// one record per user. A run's output fully replaces the prior snapshot's
/// numeric fields; records are never deleted by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub user_id: UserId,
    pub habit1_id: HabitId,
    pub habit2_id: HabitId,
    /// Pearson linear coefficient over the overlap set, rounded to 4 decimals
    pub pearson: f64,
    /// Spearman rank coefficient; absent when the rank variance is degenerate
    pub spearman: Option<f64>,
    /// Length-normalized DTW distance over normalized values; absent when the
    /// shape capability is unavailable
    pub shape_distance: Option<f64>,
    /// Count of overlapping dates the coefficients were computed from
    pub sample_size: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub computed_at: DateTime<Utc>,
}

impl CorrelationResult {
    /// Lookup key under the canonical pair ordering
    pub fn pair_key(&self) -> (HabitId, HabitId) {
        (self.habit1_id, self.habit2_id)
    }
}
