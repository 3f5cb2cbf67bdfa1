//! Shape distance (dynamic time warping)
//!
//! The warping engine is an optional capability behind the `dtw` cargo
//! feature. When it is compiled out, [`capability`] reports
//! [`ShapeCapability::Unavailable`] and every distance is absent; the rest of
//! the pipeline runs unchanged.

use serde::Serialize;

/// Whether the shape-distance engine is compiled into this build.
///
/// Resolved once at engine construction; call sites treat the unavailable
/// case as "field is absent", never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeCapability {
    Available,
    Unavailable,
}

pub fn capability() -> ShapeCapability {
    if cfg!(feature = "dtw") {
        ShapeCapability::Available
    } else {
        ShapeCapability::Unavailable
    }
}

/// Minimum-cost warping distance between two aligned sequences, divided by
/// their combined length so distances stay comparable across sample sizes.
///
/// Point costs are squared differences and the final accumulated cost is
/// square-rooted, so two identical sequences are at distance 0 and there is
/// no fixed upper bound.
#[cfg(feature = "dtw")]
pub fn normalized_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }

    // Two-row dynamic program over the full alignment matrix
    let mut prev = vec![f64::INFINITY; b.len() + 1];
    let mut curr = vec![f64::INFINITY; b.len() + 1];
    prev[0] = 0.0;

    for &x in a {
        curr[0] = f64::INFINITY;
        for (j, &y) in b.iter().enumerate() {
            let cost = (x - y) * (x - y);
            curr[j + 1] = cost + prev[j + 1].min(curr[j]).min(prev[j]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()].sqrt();
    Some(distance / (a.len() + b.len()) as f64)
}

#[cfg(not(feature = "dtw"))]
pub fn normalized_distance(_a: &[f64], _b: &[f64]) -> Option<f64> {
    None
}

#[cfg(all(test, feature = "dtw"))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_sequences_have_zero_distance() {
        let a = [0.0, 1.0, 0.5, 1.0];
        assert_eq!(normalized_distance(&a, &a), Some(0.0));
    }

    #[test]
    fn test_known_small_alignment() {
        // Constant offset of 1.0 over two points: each aligned step costs
        // 1.0 squared, accumulated 2.0, sqrt = ~1.4142, over combined length 4
        let a = [0.0, 0.0];
        let b = [1.0, 1.0];
        let d = normalized_distance(&a, &b).unwrap();
        assert!((d - 2.0_f64.sqrt() / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_shifted_sequences_are_close() {
        // A one-step shift that pointwise comparison would heavily punish
        let a = [0.0, 1.0, 0.0, 0.0, 0.0];
        let b = [0.0, 0.0, 1.0, 0.0, 0.0];
        let warped = normalized_distance(&a, &b).unwrap();

        let pointwise: f64 = a
            .iter()
            .zip(&b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
            / (a.len() + b.len()) as f64;

        assert!(warped < pointwise);
    }

    #[test]
    fn test_too_short_sequences_yield_none() {
        assert_eq!(normalized_distance(&[1.0], &[1.0, 2.0]), None);
        assert_eq!(normalized_distance(&[], &[]), None);
    }

    #[test]
    fn test_capability_reports_available() {
        assert_eq!(capability(), ShapeCapability::Available);
    }
}
