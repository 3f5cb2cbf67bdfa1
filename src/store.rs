//! Storage seams to the surrounding CRUD application
//!
//! The engine never talks to a database directly. It reads habits and
//! observations through [`HabitStore`] and persists results through
//! [`CorrelationStore`]; the web application supplies real implementations.
//! [`MemoryStore`] backs the CLI and the test suite.

use crate::types::{CorrelationResult, DateWindow, Habit, HabitId, Observation, UserId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint on (user, habit1, habit2) rejected an insert.
    /// The caller is expected to retry the losing row as an update.
    #[error("correlation already exists for pair ({0}, {1})")]
    DuplicatePair(HabitId, HabitId),

    #[error("no existing correlation for pair ({0}, {1})")]
    MissingPair(HabitId, HabitId),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Read interface into stored habits and completions
pub trait HabitStore {
    /// All user ids known to the store, ascending
    fn list_users(&self) -> Result<Vec<UserId>, StoreError>;

    /// Non-archived habits for a user, ascending by id
    fn list_active_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError>;

    /// All observations for the user's habits within the window
    fn list_observations(
        &self,
        user: UserId,
        window: &DateWindow,
    ) -> Result<Vec<Observation>, StoreError>;
}

/// Read/write interface into the correlation-result store
pub trait CorrelationStore {
    /// All stored correlation rows for a user
    fn list_correlations(&self, user: UserId) -> Result<Vec<CorrelationResult>, StoreError>;

    /// Insert new rows as one batch. Fails with [`StoreError::DuplicatePair`]
    /// without applying any row when a key already exists.
    fn create_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError>;

    /// Overwrite the numeric fields, sample size, and window bounds of
    /// existing rows as one batch.
    fn update_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError>;
}

/// In-memory store used by the CLI and tests.
///
/// Observations are keyed by (habit, date), so the at-most-one-per-day
/// invariant holds by construction: recording a value for an existing key
/// replaces it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    habits: BTreeMap<HabitId, Habit>,
    values: BTreeMap<(HabitId, chrono::NaiveDate), f64>,
    correlations: BTreeMap<(UserId, HabitId, HabitId), CorrelationResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_habit(&mut self, habit: Habit) {
        self.habits.insert(habit.id, habit);
    }

    pub fn record(&mut self, habit_id: HabitId, date: chrono::NaiveDate, value: f64) {
        self.values.insert((habit_id, date), value);
    }

    /// Delete a habit, cascading its observations and any correlation rows
    /// referencing it on either side.
    pub fn delete_habit(&mut self, habit_id: HabitId) {
        self.habits.remove(&habit_id);
        self.values.retain(|(h, _), _| *h != habit_id);
        self.correlations
            .retain(|(_, h1, h2), _| *h1 != habit_id && *h2 != habit_id);
    }

    /// Delete a user, cascading habits, observations, and correlation rows.
    pub fn delete_user(&mut self, user: UserId) {
        let habit_ids: Vec<HabitId> = self
            .habits
            .values()
            .filter(|h| h.user_id == user)
            .map(|h| h.id)
            .collect();
        for id in habit_ids {
            self.delete_habit(id);
        }
        self.correlations.retain(|(u, _, _), _| *u != user);
    }

    /// Total correlation rows stored for a user
    pub fn correlation_count(&self, user: UserId) -> usize {
        self.user_range(user).count()
    }

    fn user_range(
        &self,
        user: UserId,
    ) -> impl Iterator<Item = (&(UserId, HabitId, HabitId), &CorrelationResult)> + '_ {
        self.correlations
            .range((user, HabitId::MIN, HabitId::MIN)..=(user, HabitId::MAX, HabitId::MAX))
    }
}

impl HabitStore for MemoryStore {
    fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        let mut users: Vec<UserId> = self.habits.values().map(|h| h.user_id).collect();
        users.sort_unstable();
        users.dedup();
        Ok(users)
    }

    fn list_active_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError> {
        Ok(self
            .habits
            .values()
            .filter(|h| h.user_id == user && !h.archived)
            .cloned()
            .collect())
    }

    fn list_observations(
        &self,
        user: UserId,
        window: &DateWindow,
    ) -> Result<Vec<Observation>, StoreError> {
        let mut observations = Vec::new();
        for ((habit_id, date), value) in &self.values {
            let Some(habit) = self.habits.get(habit_id) else {
                continue;
            };
            if habit.user_id == user && window.contains(*date) {
                observations.push(Observation {
                    habit_id: *habit_id,
                    date: *date,
                    value: *value,
                });
            }
        }
        Ok(observations)
    }
}

impl CorrelationStore for MemoryStore {
    fn list_correlations(&self, user: UserId) -> Result<Vec<CorrelationResult>, StoreError> {
        Ok(self.user_range(user).map(|(_, r)| r.clone()).collect())
    }

    fn create_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError> {
        // Uniqueness check happens before any insert so a conflict leaves the
        // batch unapplied, mirroring a transactional bulk insert.
        for row in rows {
            let key = (row.user_id, row.habit1_id, row.habit2_id);
            if self.correlations.contains_key(&key) {
                return Err(StoreError::DuplicatePair(row.habit1_id, row.habit2_id));
            }
        }
        for row in rows {
            self.correlations
                .insert((row.user_id, row.habit1_id, row.habit2_id), row.clone());
        }
        Ok(rows.len())
    }

    fn update_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError> {
        for row in rows {
            let key = (row.user_id, row.habit1_id, row.habit2_id);
            if !self.correlations.contains_key(&key) {
                return Err(StoreError::MissingPair(row.habit1_id, row.habit2_id));
            }
        }
        for row in rows {
            self.correlations
                .insert((row.user_id, row.habit1_id, row.habit2_id), row.clone());
        }
        Ok(rows.len())
    }
}
