//! Series normalization
//!
//! This module rescales each habit's row to [0, 1] so that cross-habit
//! magnitude comparisons (in particular the shape distance) are meaningful.
//! Absent cells stay absent.

use crate::types::SeriesMatrix;

/// Normalizer for producing the parallel min-max scaled matrix
pub struct Normalizer;

impl Normalizer {
    /// Normalize each row over its present cells.
    ///
    /// A constant row maps every present cell to 1.0 when the constant is
    /// positive and 0.0 otherwise.
    pub fn normalize(matrix: &SeriesMatrix) -> SeriesMatrix {
        let cells = matrix
            .cells
            .iter()
            .map(|row| normalize_row(row))
            .collect();

        SeriesMatrix {
            habit_ids: matrix.habit_ids.clone(),
            dates: matrix.dates.clone(),
            cells,
        }
    }
}

fn normalize_row(row: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = row.iter().flatten().copied().collect();
    if present.is_empty() {
        return row.to_vec();
    }

    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max > min {
        row.iter()
            .map(|cell| cell.map(|v| (v - min) / (max - min)))
            .collect()
    } else {
        let constant = if min > 0.0 { 1.0 } else { 0.0 };
        row.iter().map(|cell| cell.map(|_| constant)).collect()
    }
}
