//! Pairwise correlation computation
//!
//! For every `i < j` pair of matrix rows (already in ascending habit id
//! order, so output is reproducible), this module computes up to three
//! similarity scores over the pair's overlap set:
//! - Pearson linear coefficient on raw values (hard gate: undefined ⇒ skip)
//! - Spearman rank coefficient with averaged ties (undefined ⇒ null field)
//! - length-normalized DTW shape distance on normalized values (optional)

use crate::config::EngineConfig;
use crate::shape::{self, ShapeCapability};
use crate::types::{CorrelationResult, DateWindow, SeriesMatrix, UserId};
use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;

/// Computer for evaluating all qualifying habit pairs of one user
pub struct CorrelationComputer {
    min_sample_size: usize,
    shape: ShapeCapability,
}

impl CorrelationComputer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_sample_size: config.min_sample_size,
            shape: shape::capability(),
        }
    }

    pub fn shape_capability(&self) -> ShapeCapability {
        self.shape
    }

    /// Evaluate all pairs of the raw matrix, using the parallel normalized
    /// matrix for the shape distance.
    ///
    /// Pairs with too small an overlap or an undefined linear coefficient are
    /// skipped without emitting a result, leaving any stale stored row
    /// untouched.
    pub fn compute_pairs(
        &self,
        user_id: UserId,
        raw: &SeriesMatrix,
        normalized: &SeriesMatrix,
        window: &DateWindow,
        computed_at: DateTime<Utc>,
    ) -> Vec<CorrelationResult> {
        let mut results = Vec::new();

        for i in 0..raw.num_habits() {
            for j in (i + 1)..raw.num_habits() {
                let overlap = overlap_indices(raw.row(i), raw.row(j));
                if overlap.len() < self.min_sample_size {
                    continue;
                }

                let x = select(raw.row(i), &overlap);
                let y = select(raw.row(j), &overlap);

                let Some(pearson) = pearson(&x, &y) else {
                    continue;
                };

                let spearman = spearman(&x, &y);

                let shape_distance = match self.shape {
                    ShapeCapability::Available => {
                        let nx = select(normalized.row(i), &overlap);
                        let ny = select(normalized.row(j), &overlap);
                        shape::normalized_distance(&nx, &ny)
                    }
                    ShapeCapability::Unavailable => None,
                };

                results.push(CorrelationResult {
                    user_id,
                    habit1_id: raw.habit_ids[i],
                    habit2_id: raw.habit_ids[j],
                    pearson: round4(pearson),
                    spearman: spearman.map(round4),
                    shape_distance: shape_distance.map(round4),
                    sample_size: overlap.len() as u32,
                    start_date: window.start,
                    end_date: window.end,
                    computed_at,
                });
            }
        }

        results
    }
}

/// Column indices where both rows have a present value
fn overlap_indices(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<usize> {
    a.iter()
        .zip(b)
        .enumerate()
        .filter_map(|(idx, (x, y))| (x.is_some() && y.is_some()).then_some(idx))
        .collect()
}

fn select(row: &[Option<f64>], indices: &[usize]) -> Vec<f64> {
    indices.iter().filter_map(|&idx| row[idx]).collect()
}

/// Pearson coefficient; `None` when either series has zero variance
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let sx = x.iter().std_dev();
    let sy = y.iter().std_dev();
    if sx == 0.0 || sy == 0.0 {
        return None;
    }

    let r = x.iter().covariance(y.iter()) / (sx * sy);
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Spearman coefficient: Pearson over averaged-tie ranks
fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// 1-based ranks; tied values share the mean of the ranks they span
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Round to 4 decimal places for storage stability across runs
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
