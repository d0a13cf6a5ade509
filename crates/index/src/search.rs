//! Query options, results and candidate ranking.

use quiver_core::{is_incomparable, Correlation, VectorKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub key: VectorKey,
    pub score: f32,
}

impl Neighbor {
    pub fn new(key: impl Into<VectorKey>, score: f32) -> Self {
        Self {
            key: key.into(),
            score,
        }
    }
}

/// Parameters of a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of results.
    pub k: usize,

    /// Metric used to score candidates.
    #[serde(default)]
    pub correlation: Correlation,

    /// Drop the candidate carrying the query vector's own key.
    #[serde(default)]
    pub exclude_self: bool,
}

impl QueryOptions {
    pub fn new(k: usize, correlation: Correlation) -> Self {
        Self {
            k,
            correlation,
            exclude_self: false,
        }
    }

    pub fn excluding_self(mut self) -> Self {
        self.exclude_self = true;
        self
    }
}

/// Order, filter and truncate scored candidates.
///
/// Incomparable scores are dropped. Survivors are sorted best-first for the
/// metric's kind, ties broken by key, then cut to `k`.
pub fn rank(mut scored: Vec<Neighbor>, correlation: Correlation, k: usize) -> Vec<Neighbor> {
    scored.retain(|n| !is_incomparable(n.score));
    scored.sort_by(|a, b| compare(correlation, a, b));
    scored.truncate(k);
    scored
}

fn compare(correlation: Correlation, a: &Neighbor, b: &Neighbor) -> Ordering {
    correlation
        .compare(a.score, b.score)
        .then_with(|| a.key.cmp(&b.key))
}
