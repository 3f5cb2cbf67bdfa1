//! Result reconciliation
//!
//! Diffs freshly computed pair results against the stored snapshot and
//! persists them as two independent batches: one bulk insert for new pairs
//! and one bulk overwrite for existing ones. A failure in either batch leaves
//! the other unaffected; rows carry complete field sets, so a failed user is
//! simply recomputed in full on the next run.

use crate::store::{CorrelationStore, StoreError};
use crate::types::{CorrelationResult, HabitId, UserId};
use log::{debug, warn};
use std::collections::HashSet;

/// Rows touched by one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
}

impl ReconcileOutcome {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }
}

/// Reconciler for persisting one user's freshly computed results
pub struct ResultReconciler;

impl ResultReconciler {
    pub fn reconcile<S: CorrelationStore>(
        store: &mut S,
        user: UserId,
        fresh: Vec<CorrelationResult>,
    ) -> Result<ReconcileOutcome, StoreError> {
        if fresh.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let existing: HashSet<(HabitId, HabitId)> = store
            .list_correlations(user)?
            .iter()
            .map(CorrelationResult::pair_key)
            .collect();

        let (to_update, to_create): (Vec<_>, Vec<_>) = fresh
            .into_iter()
            .partition(|r| existing.contains(&r.pair_key()));

        let mut to_update = to_update;
        let mut to_create = to_create;
        let mut created = 0;

        // If a concurrent run for the same user inserted a pair between our
        // snapshot read and this write, the store's uniqueness check rejects
        // the batch; the losing row is retried as an update instead.
        while !to_create.is_empty() {
            match store.create_batch(&to_create) {
                Ok(count) => {
                    created += count;
                    break;
                }
                Err(StoreError::DuplicatePair(h1, h2)) => {
                    warn!(
                        "user {user}: pair ({h1}, {h2}) was inserted concurrently, retrying as update"
                    );
                    let idx = to_create
                        .iter()
                        .position(|r| r.pair_key() == (h1, h2))
                        .ok_or(StoreError::DuplicatePair(h1, h2))?;
                    to_update.push(to_create.swap_remove(idx));
                }
                Err(e) => return Err(e),
            }
        }

        let updated = if to_update.is_empty() {
            0
        } else {
            store.update_batch(&to_update)?
        };

        debug!("user {user}: {created} correlations created, {updated} updated");

        Ok(ReconcileOutcome { created, updated })
    }
}
