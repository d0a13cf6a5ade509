//! LSH index configuration.

use crate::error::{LshError, LshResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an LSH index.
///
/// The three tuning knobs trade recall against latency:
/// - `bucket_width` (w): larger buckets merge more points, raising recall and
///   the number of false positives to rank away.
/// - `functions_per_table` (k): AND-composition inside a table, raising
///   precision per table at the cost of recall per table.
/// - `table_count` (L): OR-composition across tables, giving every point
///   several independent chances to collide with its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LshConfig {
    /// Dimension shared by every indexed vector.
    pub dimension: usize,

    /// Width of a projection bucket.
    #[serde(default = "default_bucket_width")]
    pub bucket_width: f32,

    /// Hash functions AND-composed into one table signature.
    #[serde(default = "default_functions_per_table")]
    pub functions_per_table: usize,

    /// Number of independently seeded tables.
    #[serde(default = "default_table_count")]
    pub table_count: usize,

    /// Random seed; identical seeds reproduce identical hash functions.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Look up tables on the rayon pool during queries.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_bucket_width() -> f32 {
    4.0
}

fn default_functions_per_table() -> usize {
    4
}

fn default_table_count() -> usize {
    8
}

fn default_seed() -> u64 {
    42
}

fn default_parallel() -> bool {
    true
}

impl LshConfig {
    /// Create new config with default values for the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            bucket_width: default_bucket_width(),
            functions_per_table: default_functions_per_table(),
            table_count: default_table_count(),
            seed: default_seed(),
            parallel: default_parallel(),
        }
    }

    /// Set the bucket width (w).
    pub fn with_bucket_width(mut self, width: f32) -> Self {
        self.bucket_width = width;
        self
    }

    /// Set the number of functions per table (k).
    pub fn with_functions_per_table(mut self, k: usize) -> Self {
        self.functions_per_table = k;
        self
    }

    /// Set the number of tables (L).
    pub fn with_table_count(mut self, tables: usize) -> Self {
        self.table_count = tables;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Look up tables sequentially.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> LshResult<()> {
        if self.dimension == 0 {
            return Err(LshError::InvalidParams("dimension must be > 0".into()));
        }
        if !self.bucket_width.is_finite() || self.bucket_width <= 0.0 {
            return Err(LshError::InvalidParams(format!(
                "bucket_width must be finite and > 0, got {}",
                self.bucket_width
            )));
        }
        if self.functions_per_table == 0 {
            return Err(LshError::InvalidParams(
                "functions_per_table must be > 0".into(),
            ));
        }
        if self.table_count == 0 {
            return Err(LshError::InvalidParams("table_count must be > 0".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> LshResult<Self> {
        let config: LshConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> LshResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Probability that a point at `distance` from the query lands in the
    /// candidate set, `1 - (1 - p^k)^L`.
    pub fn recall_at(&self, distance: f32) -> f64 {
        let p = crate::hash::collision_probability(distance, self.bucket_width);
        crate::hash::recall_probability(p, self.functions_per_table, self.table_count)
    }
}
