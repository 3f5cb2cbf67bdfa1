//! Pipeline orchestration
//!
//! This module provides the public API of the engine. One user's pass runs
//! the stages sequentially: assemble the series matrix, normalize it,
//! evaluate all pairs, reconcile against the stored snapshot. Users are
//! independent of each other; the batch pass continues past per-user
//! failures and reports them at the end.

use crate::assembler::SeriesAssembler;
use crate::config::EngineConfig;
use crate::correlation::CorrelationComputer;
use crate::error::EngineError;
use crate::normalizer::Normalizer;
use crate::reconciler::{ReconcileOutcome, ResultReconciler};
use crate::shape::ShapeCapability;
use crate::store::{CorrelationStore, HabitStore};
use crate::types::{DateWindow, UserId};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of one user's pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserRunReport {
    pub user_id: UserId,
    /// Pairs that qualified and were computed this run
    pub pairs_computed: usize,
    pub created: usize,
    pub updated: usize,
}

/// A user whose pass failed; other users are unaffected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRunFailure {
    pub user_id: UserId,
    pub error: String,
}

/// Outcome of one batch pass over all (or one filtered) user
#[derive(Debug, Clone, Serialize)]
pub struct BatchRunReport {
    pub run_id: Uuid,
    pub window: DateWindow,
    pub reports: Vec<UserRunReport>,
    pub failures: Vec<UserRunFailure>,
}

impl BatchRunReport {
    pub fn total_pairs(&self) -> usize {
        self.reports.iter().map(|r| r.pairs_computed).sum()
    }

    pub fn total_rows_touched(&self) -> usize {
        self.reports.iter().map(|r| r.created + r.updated).sum()
    }
}

/// Batch correlation engine.
///
/// Holds the run configuration and the shape capability resolved once at
/// construction.
pub struct CorrelationEngine {
    config: EngineConfig,
    computer: CorrelationComputer,
}

impl CorrelationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let computer = CorrelationComputer::new(&config);
        Self { config, computer }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn shape_capability(&self) -> ShapeCapability {
        self.computer.shape_capability()
    }

    /// Run the full pass for one user over the given window.
    ///
    /// "Nothing to compute" (too few habits, dates, or qualifying pairs)
    /// yields an empty report, not an error.
    pub fn run_user<S>(
        &self,
        store: &mut S,
        user: UserId,
        window: &DateWindow,
    ) -> Result<UserRunReport, EngineError>
    where
        S: HabitStore + CorrelationStore,
    {
        let habits = store.list_active_habits(user)?;
        if habits.len() < 2 {
            debug!("user {user}: fewer than 2 active habits, nothing to compute");
            return Ok(UserRunReport {
                user_id: user,
                ..Default::default()
            });
        }

        let observations = store.list_observations(user, window)?;

        let Some(raw) =
            SeriesAssembler::assemble(&habits, &observations, window, self.config.min_sample_size)
        else {
            debug!("user {user}: insufficient observations in window, nothing to compute");
            return Ok(UserRunReport {
                user_id: user,
                ..Default::default()
            });
        };

        let normalized = Normalizer::normalize(&raw);
        let fresh = self
            .computer
            .compute_pairs(user, &raw, &normalized, window, Utc::now());
        let pairs_computed = fresh.len();

        let ReconcileOutcome { created, updated } =
            ResultReconciler::reconcile(store, user, fresh)?;

        Ok(UserRunReport {
            user_id: user,
            pairs_computed,
            created,
            updated,
        })
    }

    /// Run the batch pass for every user in the store (or the configured
    /// single user), with the window derived from `today`.
    ///
    /// Per-user failures are collected and logged; they never abort the
    /// remaining users.
    pub fn run<S>(&self, store: &mut S, today: NaiveDate) -> Result<BatchRunReport, EngineError>
    where
        S: HabitStore + CorrelationStore,
    {
        let window = self.config.window_ending_yesterday(today)?;
        let run_id = Uuid::new_v4();

        let users: Vec<UserId> = match self.config.user_filter {
            Some(user) => vec![user],
            None => store.list_users()?,
        };

        info!(
            "run {run_id}: computing correlations from {} to {} for {} user(s)",
            window.start,
            window.end,
            users.len()
        );

        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for user in users {
            match self.run_user(store, user, &window) {
                Ok(report) => {
                    debug!(
                        "run {run_id}: user {user}: {} correlations",
                        report.pairs_computed
                    );
                    reports.push(report);
                }
                Err(e) => {
                    warn!("run {run_id}: user {user} failed: {e}");
                    failures.push(UserRunFailure {
                        user_id: user,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "run {run_id}: {} total correlations, {} failure(s)",
            reports.iter().map(|r| r.pairs_computed).sum::<usize>(),
            failures.len()
        );

        Ok(BatchRunReport {
            run_id,
            window,
            reports,
            failures,
        })
    }
}
