//! Locality-sensitive hashing index for Quiver.
//!
//! This crate implements Euclidean (p-stable) LSH for approximate nearest
//! neighbour search over dense and sparse vectors.
//!
//! Reference: "Locality-Sensitive Hashing Scheme Based on p-Stable
//! Distributions" by Datar, Immorlica, Indyk & Mirrokni, 2004
//!
//! # Features
//! - `L` independently seeded tables of `k` random projections each
//! - Reproducible hash functions from a seed or an injected generator
//! - All-or-nothing inserts and removals under a single-writer lock
//! - Parallel per-table probing with rayon
//! - Candidate scoring with any [`quiver_core::Correlation`]
//!
//! # Recall
//!
//! If one hash function makes a true neighbour collide with the query with
//! probability `p`, the neighbour reaches the candidate set with probability
//! `1 - (1 - p^k)^L`. See [`hash::collision_probability`] and
//! [`LshConfig::recall_at`].
//!
//! # Example
//! ```
//! use quiver_core::Correlation;
//! use quiver_index::{LshConfig, LshIndex};
//!
//! let config = LshConfig::new(2).with_bucket_width(4.0).with_seed(7);
//! let index = LshIndex::new(config).unwrap();
//!
//! index.insert("origin", vec![0.0, 0.0]).unwrap();
//! index.insert("far", vec![100.0, 100.0]).unwrap();
//!
//! let results = index.query(vec![0.0, 0.0], 1, Correlation::Euclidean).unwrap();
//! assert_eq!(results[0].key.as_str(), "origin");
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod search;
pub mod store;
pub mod table;

pub use config::LshConfig;
pub use error::{LshError, LshResult};
pub use hash::{EuclideanHash, HashFamily, Signature, TableHasher};
pub use index::{IndexStats, LshIndex};
pub use search::{rank, Neighbor, QueryOptions};
pub use store::{EntryId, VectorStore};
pub use table::{HashTable, TableStats};
