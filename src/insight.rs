//! Read-side insight view
//!
//! Consumers of stored correlation rows see the raw coefficients plus a
//! derived maximum-correlation-strength scalar and a qualitative bucket.
//! Both are computed on read and never stored.

use crate::types::CorrelationResult;
use serde::{Deserialize, Serialize};

/// Qualitative strength bucket over the derived 0..1 strength scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthBucket {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
    VeryWeak,
}

impl StrengthBucket {
    pub fn from_strength(strength: f64) -> Self {
        if strength >= 0.9 {
            StrengthBucket::VeryStrong
        } else if strength >= 0.7 {
            StrengthBucket::Strong
        } else if strength >= 0.5 {
            StrengthBucket::Moderate
        } else if strength >= 0.3 {
            StrengthBucket::Weak
        } else {
            StrengthBucket::VeryWeak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthBucket::VeryStrong => "very_strong",
            StrengthBucket::Strong => "strong",
            StrengthBucket::Moderate => "moderate",
            StrengthBucket::Weak => "weak",
            StrengthBucket::VeryWeak => "very_weak",
        }
    }
}

/// Maximum correlation strength across the three lenses.
///
/// Each method can surface a relationship the others miss: Pearson misses
/// monotonic-but-curved relationships, rank order misses magnitude-sensitive
/// patterns, and pointwise methods miss time-shifted similarity. The scalar
/// takes the strongest signal and is always in [0, 1].
pub fn max_strength(result: &CorrelationResult) -> f64 {
    let mut strength = result.pearson.abs();
    if let Some(spearman) = result.spearman {
        strength = strength.max(spearman.abs());
    }
    if let Some(distance) = result.shape_distance {
        strength = strength.max(1.0 - distance.min(1.0));
    }
    strength.clamp(0.0, 1.0)
}

/// Serialized view of one stored row for the read API and CLI output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationInsight {
    #[serde(flatten)]
    pub result: CorrelationResult,
    pub strength: f64,
    pub bucket: StrengthBucket,
}

impl CorrelationInsight {
    pub fn from_result(result: &CorrelationResult) -> Self {
        let strength = max_strength(result);
        Self {
            result: result.clone(),
            strength,
            bucket: StrengthBucket::from_strength(strength),
        }
    }
}
