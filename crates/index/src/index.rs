//! The LSH index: `L` hash tables plus the authoritative vector store.
//!
//! Mutations are two-phase. Signatures for every table are staged under an
//! upgradable read lock, then committed into all tables and the store after
//! upgrading to the write lock. Validation happens entirely while staging, so
//! a failed insert leaves nothing behind and readers never see a vector that
//! is only present in some tables.

use crate::config::LshConfig;
use crate::error::{LshError, LshResult};
use crate::hash::{HashFamily, Signature, TableHasher};
use crate::search::{rank, Neighbor, QueryOptions};
use crate::store::{EntryId, VectorStore};
use crate::table::{HashTable, TableStats};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use quiver_core::{Correlation, Vector, VectorKey, VectorValues};
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;

/// Key used for anonymous query vectors.
const QUERY_KEY: &str = "";

/// Locality-sensitive hashing index over vectors of one dimension.
pub struct LshIndex {
    config: LshConfig,
    state: RwLock<IndexState>,
}

struct IndexState {
    tables: Vec<HashTable>,
    store: VectorStore,
}

/// A vector with its signatures computed, ready to commit.
struct StagedInsert {
    vector: Arc<Vector>,
    signatures: Vec<Signature>,
}

/// Index-wide statistics.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub num_vectors: usize,
    pub tables: Vec<TableStats>,
    /// Mean number of entries per non-empty bucket, over all tables.
    pub avg_bucket_size: f64,
}

impl LshIndex {
    /// Create an index whose hash functions are drawn from `config.seed`.
    pub fn new(config: LshConfig) -> LshResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, &mut rng)
    }

    /// Create an index whose hash functions are drawn from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: LshConfig, rng: &mut R) -> LshResult<Self> {
        config.validate()?;
        let hashers = HashFamily::generate(&config, rng);
        Self::with_hashers(config, hashers)
    }

    /// Create an index from prepared table hashers.
    ///
    /// There must be `table_count` hashers, each holding
    /// `functions_per_table` functions over `dimension` coordinates.
    pub fn with_hashers(config: LshConfig, hashers: Vec<TableHasher>) -> LshResult<Self> {
        config.validate()?;
        if hashers.len() != config.table_count {
            return Err(LshError::InvalidParams(format!(
                "expected {} table hashers, got {}",
                config.table_count,
                hashers.len()
            )));
        }
        for hasher in &hashers {
            let functions = hasher.functions();
            if functions.len() != config.functions_per_table {
                return Err(LshError::InvalidParams(format!(
                    "expected {} functions per table, got {}",
                    config.functions_per_table,
                    functions.len()
                )));
            }
            if let Some(h) = functions
                .iter()
                .find(|h| h.projection().len() != config.dimension)
            {
                return Err(LshError::DimensionMismatch {
                    expected: config.dimension,
                    got: h.projection().len(),
                });
            }
        }

        let tables = hashers.into_iter().map(HashTable::new).collect();

        tracing::info!(
            "Created LSH index: dim={}, w={}, k={}, L={}",
            config.dimension,
            config.bucket_width,
            config.functions_per_table,
            config.table_count
        );

        Ok(Self {
            config,
            state: RwLock::new(IndexState {
                tables,
                store: VectorStore::new(),
            }),
        })
    }

    pub fn config(&self) -> &LshConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.state.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().store.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.read().store.contains(key)
    }

    /// Stored vector for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<Vector>> {
        self.state.read().store.lookup(key).map(|(_, v)| Arc::clone(v))
    }

    /// Stored vector for `key`, failing with [`LshError::NotFound`].
    pub fn lookup(&self, key: &str) -> LshResult<Arc<Vector>> {
        self.get(key)
            .ok_or_else(|| LshError::NotFound(VectorKey::from(key)))
    }

    /// All indexed keys in ascending order.
    pub fn keys(&self) -> Vec<VectorKey> {
        let state = self.state.read();
        let mut keys: Vec<VectorKey> = state.store.iter().map(|(_, v)| v.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Insert `values` under `key`, replacing any vector already stored there.
    pub fn insert(
        &self,
        key: impl Into<VectorKey>,
        values: impl Into<VectorValues>,
    ) -> LshResult<()> {
        let vector = Vector::new(key, self.config.dimension, values)?;
        self.insert_vector(vector)
    }

    /// Insert a prepared vector, replacing any vector stored under its key.
    pub fn insert_vector(&self, vector: Vector) -> LshResult<()> {
        self.check_dimension(vector.dimension())?;

        let state = self.state.upgradable_read();
        let staged = Self::stage(&state, vector);
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        let replaced = Self::commit(&mut state, staged);

        tracing::debug!(
            "Inserted vector (replaced existing: {}), index size {}",
            replaced,
            state.store.len()
        );
        Ok(())
    }

    /// Insert every `(key, values)` pair, or none of them.
    ///
    /// All items are validated and hashed before the index is touched; the
    /// first invalid item aborts the whole batch. Later duplicates of a key
    /// replace earlier ones. Returns the number of items committed.
    pub fn insert_batch<I, K, V>(&self, items: I) -> LshResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<VectorKey>,
        V: Into<VectorValues>,
    {
        let vectors = items
            .into_iter()
            .map(|(key, values)| Vector::new(key, self.config.dimension, values))
            .collect::<Result<Vec<_>, _>>()?;

        let state = self.state.upgradable_read();
        let view: &IndexState = &state;
        let staged: Vec<StagedInsert> = if self.config.parallel {
            vectors
                .into_par_iter()
                .map(|vector| Self::stage(view, vector))
                .collect()
        } else {
            vectors
                .into_iter()
                .map(|vector| Self::stage(view, vector))
                .collect()
        };

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        let count = staged.len();
        for item in staged {
            Self::commit(&mut state, item);
        }

        tracing::debug!("Inserted batch of {} vectors, index size {}", count, state.store.len());
        Ok(count)
    }

    /// Remove `key` from every table and the store.
    ///
    /// Idempotent: returns `false` when the key was not indexed.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.write();
        let removed = Self::evict(&mut state, key).is_some();
        if removed {
            tracing::debug!("Removed vector {}, index size {}", key, state.store.len());
        }
        removed
    }

    /// Remove `key`, failing with [`LshError::NotFound`] when absent.
    pub fn remove_strict(&self, key: &str) -> LshResult<()> {
        if self.remove(key) {
            Ok(())
        } else {
            Err(LshError::NotFound(VectorKey::from(key)))
        }
    }

    /// Deduplicated candidate keys for `values` before ranking, sorted by key.
    pub fn candidates(&self, values: impl Into<VectorValues>) -> LshResult<Vec<VectorKey>> {
        let query = Vector::new(QUERY_KEY, self.config.dimension, values)?;
        let state = self.state.read();
        let mut keys: Vec<VectorKey> = self
            .collect_candidates(&state, &query)
            .into_iter()
            .filter_map(|id| state.store.get(id).map(|v| v.key().clone()))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Top `k` neighbours of `values` under `correlation`.
    pub fn query(
        &self,
        values: impl Into<VectorValues>,
        k: usize,
        correlation: Correlation,
    ) -> LshResult<Vec<Neighbor>> {
        let query = Vector::new(QUERY_KEY, self.config.dimension, values)?;
        self.search(&query, &QueryOptions::new(k, correlation))
    }

    /// Top neighbours of a keyed vector.
    ///
    /// With `exclude_self`, a candidate carrying the query's key is skipped.
    pub fn search(&self, query: &Vector, options: &QueryOptions) -> LshResult<Vec<Neighbor>> {
        self.check_dimension(query.dimension())?;
        if options.k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read();
        let view: &IndexState = &state;
        let ids = self.collect_candidates(view, query);
        let num_candidates = ids.len();

        let excluded = options.exclude_self.then(|| query.key());
        let correlation = options.correlation;
        let score = |id: EntryId| -> Option<Neighbor> {
            let candidate = view.store.get(id)?;
            if excluded == Some(candidate.key()) {
                return None;
            }
            Some(Neighbor {
                key: candidate.key().clone(),
                score: correlation.coefficient(query.values(), candidate.values()),
            })
        };

        let scored: Vec<Neighbor> = if self.config.parallel {
            ids.into_par_iter().filter_map(score).collect()
        } else {
            ids.into_iter().filter_map(score).collect()
        };
        drop(state);

        let results = rank(scored, correlation, options.k);
        tracing::debug!(
            "Query scored {} candidates with {}, returned {}",
            num_candidates,
            correlation,
            results.len()
        );
        Ok(results)
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let tables: Vec<TableStats> = state.tables.iter().map(HashTable::stats).collect();
        let buckets: usize = tables.iter().map(|t| t.buckets).sum();
        let entries: usize = tables.iter().map(|t| t.entries).sum();
        IndexStats {
            num_vectors: state.store.len(),
            avg_bucket_size: if buckets == 0 {
                0.0
            } else {
                entries as f64 / buckets as f64
            },
            tables,
        }
    }

    fn check_dimension(&self, got: usize) -> LshResult<()> {
        if got != self.config.dimension {
            return Err(LshError::DimensionMismatch {
                expected: self.config.dimension,
                got,
            });
        }
        Ok(())
    }

    /// Union of the query's buckets over all tables, deduplicated.
    ///
    /// Tables are scanned in parallel when configured; the union waits for
    /// every scan.
    fn collect_candidates(&self, state: &IndexState, query: &Vector) -> Vec<EntryId> {
        let scan = |table: &HashTable| table.candidates(&table.signature(query)).to_vec();
        let per_table: Vec<Vec<EntryId>> = if self.config.parallel {
            state.tables.par_iter().map(scan).collect()
        } else {
            state.tables.iter().map(scan).collect()
        };

        let mut ids: Vec<EntryId> = per_table.into_iter().flatten().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn stage(state: &IndexState, vector: Vector) -> StagedInsert {
        let signatures = state
            .tables
            .iter()
            .map(|table| table.signature(&vector))
            .collect();
        StagedInsert {
            vector: Arc::new(vector),
            signatures,
        }
    }

    /// Apply a staged insert; returns whether an older vector was replaced.
    fn commit(state: &mut IndexState, staged: StagedInsert) -> bool {
        let replaced = Self::evict(state, staged.vector.key().as_str()).is_some();
        let id = state.store.insert(staged.vector);
        for (table, signature) in state.tables.iter_mut().zip(&staged.signatures) {
            let inserted = table.insert(id, signature);
            debug_assert!(inserted, "entry already present in table");
        }
        replaced
    }

    /// Remove a key from all tables and the store.
    fn evict(state: &mut IndexState, key: &str) -> Option<Arc<Vector>> {
        let (id, vector) = {
            let (id, vector) = state.store.lookup(key)?;
            (id, Arc::clone(vector))
        };
        for table in state.tables.iter_mut() {
            let signature = table.signature(&vector);
            let removed = table.remove(id, &signature);
            debug_assert!(removed, "entry missing from table");
        }
        state.store.remove(key).map(|(_, v)| v)
    }
}
