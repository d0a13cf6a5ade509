//! Synthetic datasets and recall measurement for Quiver.

use quiver_core::{Correlation, CoreResult, Vector, VectorKey, VectorValues};
use quiver_index::{rank, LshIndex, Neighbor};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Generate `size` dense vectors keyed `"0"`, `"1"`, ... whose coordinates
/// are integers drawn uniformly from `[0, max_value)`.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    dimension: usize,
    size: usize,
    max_value: u32,
) -> CoreResult<Vec<Vector>> {
    (0..size)
        .map(|i| {
            let values = (0..dimension)
                .map(|_| rng.gen_range(0..max_value.max(1)) as f32)
                .collect();
            Vector::dense(i.to_string(), values)
        })
        .collect()
}

/// Append `count` neighbours for every vector already in `dataset`.
///
/// Neighbour `n` of key `k` is keyed `"{k}_{n}"` and shifts each stored
/// coordinate by a uniform offset in `[-radius, radius]`.
pub fn add_neighbours<R: Rng + ?Sized>(
    rng: &mut R,
    dataset: &mut Vec<Vector>,
    count: usize,
    radius: f32,
) -> CoreResult<()> {
    let originals = dataset.len();
    dataset.reserve(originals * count);

    for i in 0..originals {
        for n in 0..count {
            let original = &dataset[i];
            let key = format!("{}_{}", original.key(), n);
            let mut shift = |value: f32| value + rng.gen_range(-radius..=radius);
            let values = match original.values() {
                VectorValues::Dense(values) => {
                    VectorValues::Dense(values.iter().map(|&v| shift(v)).collect())
                }
                VectorValues::Sparse(entries) => VectorValues::Sparse(
                    entries.iter().map(|(&index, &v)| (index, shift(v))).collect(),
                ),
            };
            let neighbour = Vector::new(key, original.dimension(), values)?;
            dataset.push(neighbour);
        }
    }
    Ok(())
}

/// Random dense vector with standard normal coordinates.
pub fn random_vector<R: Rng + ?Sized>(rng: &mut R, dimension: usize) -> Vec<f32> {
    (0..dimension).map(|_| rng.sample(StandardNormal)).collect()
}

/// Exact top-`k` keys for every query by exhaustive scoring.
///
/// A dataset vector sharing the query's key is skipped, matching a search
/// with `exclude_self`.
pub fn ground_truth(
    queries: &[Vector],
    dataset: &[Vector],
    correlation: Correlation,
    k: usize,
) -> Vec<Vec<VectorKey>> {
    queries
        .par_iter()
        .map(|query| {
            let scored: Vec<Neighbor> = dataset
                .iter()
                .filter(|v| v.key() != query.key())
                .map(|v| Neighbor {
                    key: v.key().clone(),
                    score: correlation.coefficient(query.values(), v.values()),
                })
                .collect();
            rank(scored, correlation, k)
                .into_iter()
                .map(|n| n.key)
                .collect()
        })
        .collect()
}

/// Fraction of `truth` present in `found`; `1.0` when there is nothing to find.
pub fn recall_at_k(found: &[Neighbor], truth: &[VectorKey]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let found: HashSet<&VectorKey> = found.iter().map(|n| &n.key).collect();
    let hits = truth.iter().filter(|key| found.contains(key)).count();
    hits as f64 / truth.len() as f64
}

/// Mean fraction of each query's true neighbours reaching its candidate set.
pub fn candidate_recall(
    index: &LshIndex,
    queries: &[Vector],
    truth: &[Vec<VectorKey>],
) -> quiver_index::LshResult<f64> {
    if queries.is_empty() {
        return Ok(1.0);
    }
    let mut total = 0.0;
    for (query, truth) in queries.iter().zip(truth) {
        let candidates: HashSet<VectorKey> = index
            .candidates(query.values().clone())?
            .into_iter()
            .collect();
        total += if truth.is_empty() {
            1.0
        } else {
            truth.iter().filter(|key| candidates.contains(*key)).count() as f64
                / truth.len() as f64
        };
    }
    Ok(total / queries.len() as f64)
}

/// Latency at quantile `q` of sorted samples, in milliseconds.
pub fn percentile_ms(sorted: &[Duration], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[index].as_secs_f64() * 1000.0
}

/// Results for one parameter setting.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub bucket_width: f32,
    pub functions_per_table: usize,
    pub table_count: usize,
    pub top_k: usize,
    pub num_queries: usize,
    pub mean_recall: f64,
    pub candidate_recall: f64,
    /// Recall the collision model predicts at the neighbour radius.
    pub expected_recall: f64,
    pub mean_candidates: f64,
    pub build_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub qps: f64,
}

/// Write results to a CSV file.
pub fn write_csv(path: &Path, results: &[BenchmarkResult]) -> anyhow::Result<()> {
    let mut file = File::create(path)?;

    writeln!(
        file,
        "w,k,L,top_k,num_queries,mean_recall,candidate_recall,expected_recall,mean_candidates,build_ms,p50_ms,p95_ms,p99_ms,qps"
    )?;

    for r in results {
        writeln!(
            file,
            "{},{},{},{},{},{:.6},{:.6},{:.6},{:.1},{:.3},{:.3},{:.3},{:.3},{:.1}",
            r.bucket_width,
            r.functions_per_table,
            r.table_count,
            r.top_k,
            r.num_queries,
            r.mean_recall,
            r.candidate_recall,
            r.expected_recall,
            r.mean_candidates,
            r.build_ms,
            r.p50_latency_ms,
            r.p95_latency_ms,
            r.p99_latency_ms,
            r.qps
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_index::LshConfig;
    use rand::prelude::*;

    #[test]
    fn test_generate_keys_and_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let dataset = generate(&mut rng, 4, 10, 5).unwrap();
        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset[3].key().as_str(), "3");
        for v in &dataset {
            let values = v.values().as_dense().unwrap();
            assert_eq!(values.len(), 4);
            assert!(values.iter().all(|&x| (0.0..5.0).contains(&x) && x.fract() == 0.0));
        }
    }

    #[test]
    fn test_add_neighbours() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut dataset = generate(&mut rng, 3, 4, 100).unwrap();
        add_neighbours(&mut rng, &mut dataset, 2, 0.5).unwrap();

        assert_eq!(dataset.len(), 4 + 4 * 2);
        assert_eq!(dataset[4].key().as_str(), "0_0");
        assert_eq!(dataset[5].key().as_str(), "0_1");

        let original = dataset[0].values().as_dense().unwrap();
        let neighbour = dataset[5].values().as_dense().unwrap();
        for (o, n) in original.iter().zip(neighbour) {
            assert!((o - n).abs() <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_ground_truth_skips_self() {
        let dataset = vec![
            Vector::dense("a", vec![0.0, 0.0]).unwrap(),
            Vector::dense("b", vec![1.0, 0.0]).unwrap(),
            Vector::dense("c", vec![5.0, 5.0]).unwrap(),
        ];
        let truth = ground_truth(&dataset[..1], &dataset, Correlation::Euclidean, 2);
        assert_eq!(truth, vec![vec![VectorKey::from("b"), VectorKey::from("c")]]);
    }

    #[test]
    fn test_recall_at_k() {
        let found = vec![Neighbor::new("a", 0.0), Neighbor::new("x", 1.0)];
        let truth = vec![VectorKey::from("a"), VectorKey::from("b")];
        assert_eq!(recall_at_k(&found, &truth), 0.5);
        assert_eq!(recall_at_k(&found, &[]), 1.0);
    }

    #[test]
    fn test_candidate_recall_with_wide_buckets() {
        let index = LshIndex::new(
            LshConfig::new(2)
                .with_bucket_width(1e4)
                .with_functions_per_table(1)
                .with_table_count(4),
        )
        .unwrap();
        index.insert("a", vec![0.0, 0.0]).unwrap();
        index.insert("b", vec![1.0, 1.0]).unwrap();

        let queries = vec![Vector::dense("a", vec![0.0, 0.0]).unwrap()];
        let truth = vec![vec![VectorKey::from("b")]];
        assert_eq!(candidate_recall(&index, &queries, &truth).unwrap(), 1.0);
    }

    #[test]
    fn test_percentile() {
        let samples: Vec<Duration> = (1..=10).map(Duration::from_millis).collect();
        assert_eq!(percentile_ms(&samples, 0.5), 6.0);
        assert_eq!(percentile_ms(&samples, 0.99), 10.0);
        assert_eq!(percentile_ms(&[], 0.5), 0.0);
    }

    #[test]
    fn test_write_csv() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = BenchmarkResult {
            bucket_width: 4.0,
            functions_per_table: 4,
            table_count: 8,
            top_k: 3,
            num_queries: 10,
            mean_recall: 0.9,
            candidate_recall: 0.95,
            expected_recall: 0.97,
            mean_candidates: 12.0,
            build_ms: 1.5,
            p50_latency_ms: 0.1,
            p95_latency_ms: 0.2,
            p99_latency_ms: 0.3,
            qps: 1000.0,
        };
        write_csv(file.path(), &[result]).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("w,k,L,"));
        assert!(lines[1].starts_with("4,4,8,3,10,0.900000"));
    }
}
