//! Random projection hash functions for Euclidean LSH.
//!
//! Each function projects a vector onto a Gaussian direction `a`, shifts it by
//! an offset `b` drawn uniformly from `[0, w)` and cuts the line into buckets
//! of width `w`:
//!
//! ```text
//! h(v) = floor((a·v + b) / w)
//! ```
//!
//! Because Gaussians are 2-stable, `a·u - a·v` is distributed as
//! `‖u - v‖ · N(0, 1)`, so nearby points fall into the same bucket more often
//! than distant ones. A table concatenates `k` such values into a
//! [`Signature`] (AND); an index holds `L` tables (OR).
//!
//! Reference: Datar, Immorlica, Indyk & Mirrokni (2004). "Locality-sensitive
//! hashing scheme based on p-stable distributions."

use crate::config::LshConfig;
use quiver_core::Vector;
use rand::prelude::*;
use rand_distr::StandardNormal;
use smallvec::SmallVec;

/// Bucket key of one table: `k` projection coordinates.
pub type Signature = SmallVec<[i64; 8]>;

/// A single `h(v) = floor((a·v + b) / w)` function.
#[derive(Debug, Clone, PartialEq)]
pub struct EuclideanHash {
    projection: Vec<f32>,
    offset: f32,
    width: f32,
}

impl EuclideanHash {
    /// Draw a function from `rng`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, dimension: usize, width: f32) -> Self {
        let projection = (0..dimension)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        let offset = rng.gen_range(0.0..width);
        Self {
            projection,
            offset,
            width,
        }
    }

    /// Build a function from explicit parts.
    pub fn from_parts(projection: Vec<f32>, offset: f32, width: f32) -> Self {
        Self {
            projection,
            offset,
            width,
        }
    }

    pub fn projection(&self) -> &[f32] {
        &self.projection
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Bucket coordinate of `vector`.
    #[inline]
    pub fn hash(&self, vector: &Vector) -> i64 {
        let projected = vector.dot(&self.projection);
        ((projected + self.offset) / self.width).floor() as i64
    }
}

/// The `k` functions of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHasher {
    seed: u64,
    functions: Vec<EuclideanHash>,
}

impl TableHasher {
    /// Draw `k` functions from a generator seeded with `seed`.
    pub fn from_seed(seed: u64, dimension: usize, width: f32, k: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let functions = (0..k)
            .map(|_| EuclideanHash::random(&mut rng, dimension, width))
            .collect();
        Self { seed, functions }
    }

    pub fn from_functions(seed: u64, functions: Vec<EuclideanHash>) -> Self {
        Self { seed, functions }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn functions(&self) -> &[EuclideanHash] {
        &self.functions
    }

    /// Signature of `vector` in this table.
    pub fn signature(&self, vector: &Vector) -> Signature {
        self.functions.iter().map(|h| h.hash(vector)).collect()
    }
}

/// Generator of per-table hashers.
pub struct HashFamily;

impl HashFamily {
    /// Generate `L` hashers of `k` functions each.
    ///
    /// Every table is seeded with its own `u64` drawn from `rng`, so the same
    /// generator state always yields the same functions.
    pub fn generate<R: Rng + ?Sized>(config: &LshConfig, rng: &mut R) -> Vec<TableHasher> {
        (0..config.table_count)
            .map(|_| {
                let seed: u64 = rng.gen();
                TableHasher::from_seed(
                    seed,
                    config.dimension,
                    config.bucket_width,
                    config.functions_per_table,
                )
            })
            .collect()
    }
}

/// Probability that one hash function maps two points at `distance` into the
/// same bucket of width `width`.
///
/// ```text
/// p(c) = 1 - 2Φ(-w/c) - 2 / (√(2π) · w/c) · (1 - e^(-(w/c)²/2))
/// ```
pub fn collision_probability(distance: f32, width: f32) -> f64 {
    if distance <= 0.0 {
        return 1.0;
    }
    let r = width as f64 / distance as f64;
    let tail = 2.0 * normal_cdf(-r);
    let spread = 2.0 / ((2.0 * std::f64::consts::PI).sqrt() * r) * (1.0 - (-r * r / 2.0).exp());
    (1.0 - tail - spread).clamp(0.0, 1.0)
}

/// Probability that a point with per-function collision probability `p`
/// collides with the query in at least one of `tables` tables of `k`
/// functions.
pub fn recall_probability(p: f64, k: usize, tables: usize) -> f64 {
    let per_table = p.powi(k as i32);
    1.0 - (1.0 - per_table).powi(tables as i32)
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_formula() {
        let h = EuclideanHash::from_parts(vec![1.0, 2.0], 0.5, 2.0);
        let v = Vector::dense("v", vec![1.5, 1.0]).unwrap();
        // (1.5 + 2.0 + 0.5) / 2.0 = 2.0
        assert_eq!(h.hash(&v), 2);

        let w = Vector::dense("w", vec![-3.0, 0.0]).unwrap();
        // (-3.0 + 0.5) / 2.0 = -1.25 -> -2
        assert_eq!(h.hash(&w), -2);
    }

    #[test]
    fn test_sparse_and_dense_hash_alike() {
        let hasher = TableHasher::from_seed(11, 6, 1.0, 5);
        let dense = Vector::dense("d", vec![0.0, 2.0, 0.0, 0.0, -1.0, 0.0]).unwrap();
        let sparse = Vector::sparse("s", 6, [(1, 2.0), (4, -1.0)]).unwrap();
        assert_eq!(hasher.signature(&dense), hasher.signature(&sparse));
    }

    #[test]
    fn test_sparse_and_dense_hash_alike_near_boundaries() {
        let dim = 37;
        let mut data_rng = StdRng::seed_from_u64(99);
        for seed in 0..500 {
            let hasher = TableHasher::from_seed(seed, dim, 0.01, 8);
            let values: Vec<f32> = (0..dim)
                .map(|_| {
                    if data_rng.gen_bool(0.25) {
                        0.0
                    } else {
                        data_rng.gen_range(-3.0..3.0)
                    }
                })
                .collect();
            let entries: Vec<(usize, f32)> = values
                .iter()
                .copied()
                .enumerate()
                .filter(|&(_, v)| v != 0.0)
                .collect();

            let dense = Vector::dense("d", values).unwrap();
            let sparse = Vector::sparse("s", dim, entries).unwrap();
            assert_eq!(hasher.signature(&dense), hasher.signature(&sparse), "seed {}", seed);
        }
    }

    #[test]
    fn test_from_functions_keeps_parts() {
        let functions = vec![
            EuclideanHash::from_parts(vec![1.0, 0.0], 0.25, 1.0),
            EuclideanHash::from_parts(vec![0.0, 1.0], 0.75, 1.0),
        ];
        let hasher = TableHasher::from_functions(7, functions.clone());
        assert_eq!(hasher.seed(), 7);
        assert_eq!(hasher.functions(), functions.as_slice());

        let v = Vector::dense("v", vec![1.5, -0.5]).unwrap();
        // floor(1.75) = 1, floor(0.25) = 0
        assert_eq!(hasher.signature(&v).as_slice(), &[1, 0]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = LshConfig::new(8).with_table_count(3).with_functions_per_table(2);
        let a = HashFamily::generate(&config, &mut StdRng::seed_from_u64(5));
        let b = HashFamily::generate(&config, &mut StdRng::seed_from_u64(5));
        let c = HashFamily::generate(&config, &mut StdRng::seed_from_u64(6));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(|t| t.functions().len() == 2));
    }

    #[test]
    fn test_tables_get_distinct_seeds() {
        let config = LshConfig::new(4).with_table_count(6);
        let tables = HashFamily::generate(&config, &mut StdRng::seed_from_u64(1));
        let mut seeds: Vec<u64> = tables.iter().map(|t| t.seed()).collect();
        seeds.sort_unstable();
        seeds.dedup();
        assert_eq!(seeds.len(), 6);
    }

    #[test]
    fn test_offsets_within_width() {
        let hasher = TableHasher::from_seed(3, 4, 0.75, 32);
        for h in hasher.functions() {
            assert!(h.offset() >= 0.0 && h.offset() < 0.75);
            assert_eq!(h.projection().len(), 4);
        }
    }

    #[test]
    fn test_collision_probability_shape() {
        assert_eq!(collision_probability(0.0, 4.0), 1.0);
        let near = collision_probability(0.5, 4.0);
        let mid = collision_probability(2.0, 4.0);
        let far = collision_probability(20.0, 4.0);
        assert!(near > mid && mid > far);
        assert!(near > 0.85 && near < 1.0);
        assert!(far > 0.0 && far < 0.2);
    }

    #[test]
    fn test_recall_probability() {
        assert!((recall_probability(1.0, 4, 3) - 1.0).abs() < 1e-12);
        assert_eq!(recall_probability(0.0, 4, 3), 0.0);
        // p = 0.5, k = 1, L = 2 -> 1 - 0.25
        assert!((recall_probability(0.5, 1, 2) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_erf_reference_points() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    }
}
