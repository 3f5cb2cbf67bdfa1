//! Series assembly
//!
//! This module turns raw per-habit-per-day observations into an aligned
//! series matrix for one user and one window:
//! - habits with zero in-window observations are dropped
//! - columns are the sorted union of dates observed by any qualifying habit
//! - cells without an observation stay absent, never zero

use crate::types::{DateWindow, Habit, HabitId, Observation, SeriesMatrix};
use std::collections::{BTreeMap, BTreeSet};

/// Assembler for building the per-user series matrix
pub struct SeriesAssembler;

impl SeriesAssembler {
    /// Assemble the matrix for one user's window.
    ///
    /// Returns `None` when there is nothing to compute: fewer than two habits
    /// with in-window observations, or fewer distinct observed dates than
    /// `min_sample_size`. That outcome is expected, not an error.
    pub fn assemble(
        habits: &[Habit],
        observations: &[Observation],
        window: &DateWindow,
        min_sample_size: usize,
    ) -> Option<SeriesMatrix> {
        if habits.len() < 2 {
            return None;
        }

        let included: BTreeSet<HabitId> = habits.iter().map(|h| h.id).collect();

        // Per-habit date -> value, restricted to included habits and the window
        let mut series: BTreeMap<HabitId, BTreeMap<chrono::NaiveDate, f64>> = BTreeMap::new();
        for obs in observations {
            if included.contains(&obs.habit_id) && window.contains(obs.date) {
                series
                    .entry(obs.habit_id)
                    .or_default()
                    .insert(obs.date, obs.value);
            }
        }

        // Habits with no in-window observations never enter `series`, so
        // this count is over qualifying habits only
        if series.len() < 2 {
            return None;
        }

        let dates: Vec<chrono::NaiveDate> = series
            .values()
            .flat_map(|values| values.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if dates.len() < min_sample_size {
            return None;
        }

        // BTreeMap iteration gives ascending habit id order for the rows
        let habit_ids: Vec<HabitId> = series.keys().copied().collect();
        let cells: Vec<Vec<Option<f64>>> = habit_ids
            .iter()
            .map(|id| {
                let values = &series[id];
                dates.iter().map(|d| values.get(d).copied()).collect()
            })
            .collect();

        Some(SeriesMatrix {
            habit_ids,
            dates,
            cells,
        })
    }
}
