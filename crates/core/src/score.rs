//! Scores and specificity tiers used to rank candidate skills.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How specific a skill's recognition is.
///
/// Higher tiers always win over lower ones, as long as the best candidate of
/// the higher tier clears its acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Low,
    Medium,
    High,
}

impl Specificity {
    /// All tiers, most specific first.
    pub const DESCENDING: [Specificity; 3] =
        [Specificity::High, Specificity::Medium, Specificity::Low];
}

impl std::fmt::Display for Specificity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Specificity::Low => "low",
            Specificity::Medium => "medium",
            Specificity::High => "high",
        };
        f.write_str(name)
    }
}

/// How well an utterance matched a skill.
///
/// Total order: `AlwaysBest` > any `Numeric` > `AlwaysWorst`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    /// A similarity in `0.0..=1.0`.
    Numeric(f64),
    /// Guaranteed winner within its tier.
    AlwaysBest,
    /// Guaranteed non-match.
    AlwaysWorst,
}

impl Score {
    /// Build a numeric score, clamped to `0.0..=1.0`. NaN is treated as a non-match.
    pub fn numeric(value: f64) -> Self {
        if value.is_nan() {
            Score::AlwaysWorst
        } else {
            Score::Numeric(value.clamp(0.0, 1.0))
        }
    }

    /// Whether this score is good enough to be picked in a tier with the given threshold.
    pub fn is_acceptable(&self, threshold: f64) -> bool {
        match self {
            Score::AlwaysBest => true,
            Score::AlwaysWorst => false,
            Score::Numeric(value) => *value >= threshold,
        }
    }

    /// Position of the score in `0.0..=1.0`, with sentinels at the extremes.
    pub fn as_f64(&self) -> f64 {
        match self {
            Score::AlwaysBest => 1.0,
            Score::AlwaysWorst => 0.0,
            Score::Numeric(value) => *value,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Score::AlwaysWorst => 0,
            Score::Numeric(_) => 1,
            Score::AlwaysBest => 2,
        }
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Score::Numeric(a), Score::Numeric(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Numeric(value) => write!(f, "{value:.2}"),
            Score::AlwaysBest => f.write_str("always-best"),
            Score::AlwaysWorst => f.write_str("always-worst"),
        }
    }
}
