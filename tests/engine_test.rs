//! End-to-end tests for the batch correlation engine

use chrono::NaiveDate;
use habit_correlate::{
    CorrelationEngine, CorrelationInsight, CorrelationResult, CorrelationStore, DateWindow,
    EngineConfig, Habit, HabitId, HabitStore, MemoryStore, Observation, StoreError,
    StrengthBucket, UserId,
};
use pretty_assertions::assert_eq;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn add_series(store: &mut MemoryStore, user: UserId, habit_id: HabitId, values: &[f64]) {
    store.add_habit(Habit {
        id: habit_id,
        user_id: user,
        archived: false,
    });
    for (offset, &value) in values.iter().enumerate() {
        store.record(habit_id, date(1 + offset as u32), value);
    }
}

#[test]
fn identical_weekly_sequences_are_very_strong() {
    // Habits A and B recorded the identical [1,1,0,1,1,0,1] week
    let seq = [1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &seq);
    add_series(&mut store, 1, 2, &seq);

    let engine = CorrelationEngine::new(EngineConfig::default());
    let report = engine.run(&mut store, date(8)).unwrap();

    assert_eq!(report.total_pairs(), 1);

    let stored = store.list_correlations(1).unwrap();
    let r = &stored[0];
    assert_eq!(r.pearson, 1.0);
    assert_eq!(r.spearman, Some(1.0));
    assert_eq!(r.sample_size, 7);
    #[cfg(feature = "dtw")]
    assert_eq!(r.shape_distance, Some(0.0));

    let insight = CorrelationInsight::from_result(r);
    assert_eq!(insight.strength, 1.0);
    assert_eq!(insight.bucket, StrengthBucket::VeryStrong);
}

#[test]
fn perfectly_inverse_habits_bucket_on_absolute_value() {
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 0.0, 1.0, 0.0, 1.0]);
    add_series(&mut store, 1, 2, &[0.0, 1.0, 0.0, 1.0, 0.0]);

    let engine = CorrelationEngine::new(EngineConfig::default());
    let window = DateWindow::new(date(1), date(5));
    engine.run_user(&mut store, 1, &window).unwrap();

    let stored = store.list_correlations(1).unwrap();
    assert_eq!(stored[0].pearson, -1.0);

    let insight = CorrelationInsight::from_result(&stored[0]);
    assert_eq!(insight.bucket, StrengthBucket::VeryStrong);
}

#[test]
fn overlap_boundary_at_min_sample_size() {
    // Habit 2 skips one shared day: overlap is exactly 4 for habit 3,
    // and 3 (excluded) for habit 2
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    store.add_habit(Habit {
        id: 2,
        user_id: 1,
        archived: false,
    });
    for d in [1, 2, 3] {
        store.record(2, date(d), d as f64);
    }
    store.add_habit(Habit {
        id: 3,
        user_id: 1,
        archived: false,
    });
    for d in [1, 2, 3, 4] {
        store.record(3, date(d), (d * 2) as f64);
    }

    let engine = CorrelationEngine::new(EngineConfig::default());
    let window = DateWindow::new(date(1), date(7));
    engine.run_user(&mut store, 1, &window).unwrap();

    let pairs: Vec<(HabitId, HabitId)> = store
        .list_correlations(1)
        .unwrap()
        .iter()
        .map(CorrelationResult::pair_key)
        .collect();

    assert!(pairs.contains(&(1, 3)));
    assert!(!pairs.contains(&(1, 2)));
    // Habits 2 and 3 overlap on three dates only
    assert!(!pairs.contains(&(2, 3)));
}

#[test]
fn constant_habits_yield_no_linear_coefficient() {
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 1.0, 1.0, 1.0, 1.0]);
    add_series(&mut store, 1, 2, &[1.0, 1.0, 1.0, 1.0, 1.0]);

    let engine = CorrelationEngine::new(EngineConfig::default());
    let report = engine.run(&mut store, date(8)).unwrap();

    assert_eq!(report.total_pairs(), 0);
    assert_eq!(store.correlation_count(1), 0);
}

#[test]
fn archived_habits_are_excluded() {
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 2.0, 3.0, 4.0]);
    add_series(&mut store, 1, 2, &[2.0, 4.0, 6.0, 8.0]);
    store.add_habit(Habit {
        id: 3,
        user_id: 1,
        archived: true,
    });
    for d in 1..=4 {
        store.record(3, date(d), d as f64);
    }

    let engine = CorrelationEngine::new(EngineConfig::default());
    engine.run(&mut store, date(8)).unwrap();

    let pairs: Vec<(HabitId, HabitId)> = store
        .list_correlations(1)
        .unwrap()
        .iter()
        .map(CorrelationResult::pair_key)
        .collect();
    assert_eq!(pairs, vec![(1, 2)]);
}

#[test]
fn repeated_batch_runs_are_idempotent() {
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0]);
    add_series(&mut store, 1, 2, &[2.0, 7.0, 1.0, 8.0, 2.0, 8.0, 1.0]);
    add_series(&mut store, 2, 10, &[1.0, 2.0, 3.0, 4.0]);
    add_series(&mut store, 2, 11, &[1.0, 3.0, 2.0, 4.0]);

    let engine = CorrelationEngine::new(EngineConfig::default());

    let first = engine.run(&mut store, date(8)).unwrap();
    let numeric_fields = |store: &MemoryStore, user: UserId| -> Vec<_> {
        store
            .list_correlations(user)
            .unwrap()
            .into_iter()
            .map(|r| {
                (
                    r.pair_key(),
                    r.pearson,
                    r.spearman,
                    r.shape_distance,
                    r.sample_size,
                    r.start_date,
                    r.end_date,
                )
            })
            .collect()
    };
    let snapshot1 = (numeric_fields(&store, 1), numeric_fields(&store, 2));

    let second = engine.run(&mut store, date(8)).unwrap();
    let snapshot2 = (numeric_fields(&store, 1), numeric_fields(&store, 2));

    assert_eq!(snapshot1, snapshot2);
    assert_eq!(first.total_pairs(), second.total_pairs());
    assert_eq!(store.correlation_count(1), 1);
    assert_eq!(store.correlation_count(2), 1);

    // Second run overwrites in place, creating nothing
    assert!(second.reports.iter().all(|r| r.created == 0));
}

#[test]
fn habit_deletion_cascades_stored_results() {
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 2.0, 3.0, 4.0]);
    add_series(&mut store, 1, 2, &[2.0, 4.0, 6.0, 8.0]);

    let engine = CorrelationEngine::new(EngineConfig::default());
    engine.run(&mut store, date(8)).unwrap();
    assert_eq!(store.correlation_count(1), 1);

    store.delete_habit(1);
    assert_eq!(store.correlation_count(1), 0);
}

/// Store wrapper that fails observation reads for one user
struct FlakyStore {
    inner: MemoryStore,
    failing_user: UserId,
}

impl HabitStore for FlakyStore {
    fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.list_users()
    }
    fn list_active_habits(&self, user: UserId) -> Result<Vec<Habit>, StoreError> {
        self.inner.list_active_habits(user)
    }
    fn list_observations(
        &self,
        user: UserId,
        window: &DateWindow,
    ) -> Result<Vec<Observation>, StoreError> {
        if user == self.failing_user {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.list_observations(user, window)
    }
}

impl CorrelationStore for FlakyStore {
    fn list_correlations(&self, user: UserId) -> Result<Vec<CorrelationResult>, StoreError> {
        self.inner.list_correlations(user)
    }
    fn create_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError> {
        self.inner.create_batch(rows)
    }
    fn update_batch(&mut self, rows: &[CorrelationResult]) -> Result<usize, StoreError> {
        self.inner.update_batch(rows)
    }
}

#[test]
fn one_failing_user_does_not_abort_the_batch() {
    let mut inner = MemoryStore::new();
    add_series(&mut inner, 1, 1, &[1.0, 2.0, 3.0, 4.0]);
    add_series(&mut inner, 1, 2, &[2.0, 4.0, 6.0, 8.0]);
    add_series(&mut inner, 2, 10, &[1.0, 2.0, 3.0, 4.0]);
    add_series(&mut inner, 2, 11, &[4.0, 3.0, 2.0, 1.0]);

    let mut store = FlakyStore {
        inner,
        failing_user: 1,
    };

    let engine = CorrelationEngine::new(EngineConfig::default());
    let report = engine.run(&mut store, date(8)).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].user_id, 1);
    assert_eq!(report.reports.len(), 1);
    assert_eq!(report.reports[0].user_id, 2);
    assert_eq!(store.inner.correlation_count(2), 1);
    assert_eq!(store.inner.correlation_count(1), 0);
}

#[test]
fn divergent_tracking_frequency_uses_sparse_overlap() {
    // Habit 1 tracked daily, habit 2 only every other day. Missing days must
    // not be zero-filled: over the shared dates the relationship is exact.
    let mut store = MemoryStore::new();
    add_series(&mut store, 1, 1, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0, 4.0]);
    store.add_habit(Habit {
        id: 2,
        user_id: 1,
        archived: false,
    });
    for (d, v) in [(1, 10.0), (3, 20.0), (5, 30.0), (7, 40.0)] {
        store.record(2, date(d), v);
    }

    let engine = CorrelationEngine::new(EngineConfig::default());
    engine.run(&mut store, date(8)).unwrap();

    let stored = store.list_correlations(1).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sample_size, 4);
    assert_eq!(stored[0].pearson, 1.0);
}
