//! Recall benchmark tool for Quiver.
//!
//! Builds an LSH index over a synthetic dataset with planted neighbours and
//! compares its top-K results against exhaustive ground truth, for a range
//! of bucket widths.

use clap::Parser;
use quiver_bench::{
    add_neighbours, candidate_recall, generate, ground_truth, percentile_ms, recall_at_k,
    write_csv, BenchmarkResult,
};
use quiver_core::{Correlation, Vector, VectorKey};
use quiver_index::{LshConfig, LshIndex, QueryOptions};
use rand::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Recall benchmark tool for Quiver.
#[derive(Parser, Debug)]
#[command(name = "recall-bench")]
#[command(about = "Benchmark recall@K of LSH search vs brute-force ground truth")]
struct Args {
    /// Index configuration JSON; command-line parameters override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vector dimension [default: 10].
    #[arg(long)]
    dimension: Option<usize>,

    /// Number of base vectors in the dataset.
    #[arg(long, default_value = "1000")]
    size: usize,

    /// Upper bound (exclusive) of the integer base coordinates.
    #[arg(long, default_value = "100")]
    max_value: u32,

    /// Neighbours planted around every base vector.
    #[arg(long, default_value = "3")]
    neighbours: usize,

    /// Per-coordinate radius of the planted neighbours.
    #[arg(long, default_value = "1.0")]
    radius: f32,

    /// Comma-separated list of bucket widths to test.
    #[arg(long, default_value = "2,4,8,16")]
    widths: String,

    /// Hash functions per table.
    #[arg(short = 'k', long)]
    functions_per_table: Option<usize>,

    /// Number of hash tables.
    #[arg(short = 'l', long)]
    tables: Option<usize>,

    /// Seed for the dataset and the hash functions.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of top results to retrieve (K in recall@K).
    #[arg(long, default_value = "3")]
    top_k: usize,

    /// Number of query vectors to use.
    #[arg(long, default_value = "100")]
    num_queries: usize,

    /// Correlation used for ranking.
    #[arg(long, default_value = "euclidean")]
    correlation: Correlation,

    /// Hash and score on the calling thread only.
    #[arg(long)]
    sequential: bool,

    /// Output CSV file path.
    #[arg(long, default_value = "lsh_recall.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let widths: Vec<f32> = args
        .widths
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if widths.is_empty() {
        anyhow::bail!("No valid bucket widths provided");
    }

    let mut base = match &args.config {
        Some(path) => LshConfig::load(path)?,
        None => LshConfig::new(10),
    };
    if let Some(dimension) = args.dimension {
        base.dimension = dimension;
    }
    if let Some(k) = args.functions_per_table {
        base.functions_per_table = k;
    }
    if let Some(tables) = args.tables {
        base.table_count = tables;
    }
    base.seed = args.seed;
    if args.sequential {
        base.parallel = false;
    }

    tracing::info!("Starting recall benchmark");
    tracing::info!("  Dimension: {}", base.dimension);
    tracing::info!("  Dataset: {} base vectors x {} neighbours", args.size, args.neighbours);
    tracing::info!("  Radius: {}", args.radius);
    tracing::info!("  k={}, L={}", base.functions_per_table, base.table_count);
    tracing::info!("  Widths: {:?}", widths);
    tracing::info!("  Correlation: {}", args.correlation);
    tracing::info!("  Top-K: {}", args.top_k);
    tracing::info!("  Seed: {}", args.seed);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut dataset = generate(&mut rng, base.dimension, args.size, args.max_value)?;
    add_neighbours(&mut rng, &mut dataset, args.neighbours, args.radius)?;
    tracing::info!("Generated {} vectors", dataset.len());

    if dataset.is_empty() {
        anyhow::bail!("Dataset is empty");
    }

    let num_queries = args.num_queries.min(args.size);
    let queries: Vec<Vector> = dataset[..args.size]
        .choose_multiple(&mut rng, num_queries)
        .cloned()
        .collect();

    tracing::info!("Computing ground truth (brute-force search)...");
    let truth = ground_truth(&queries, &dataset, args.correlation, args.top_k);

    // Planted neighbours sit at most radius * sqrt(d) away.
    let neighbour_distance = args.radius * (base.dimension as f32).sqrt();

    let mut results = Vec::with_capacity(widths.len());
    for &width in &widths {
        let config = base.clone().with_bucket_width(width);
        let result = run_benchmark(&config, &dataset, &queries, &truth, &args, neighbour_distance)?;

        tracing::info!(
            "  w={}: recall={:.4}, candidates={:.1}, expected={:.4}, p50={:.3}ms, qps={:.0}",
            result.bucket_width,
            result.mean_recall,
            result.mean_candidates,
            result.expected_recall,
            result.p50_latency_ms,
            result.qps
        );
        results.push(result);
    }

    write_csv(&args.output, &results)?;
    tracing::info!("Results written to {:?}", args.output);

    println!("\n{}", "=".repeat(96));
    println!("LSH RECALL BENCHMARK RESULTS");
    println!("{}", "=".repeat(96));
    println!(
        "{:>8} {:>4} {:>4} {:>10} {:>12} {:>12} {:>12} {:>10} {:>10} {:>10}",
        "w", "k", "L", "recall", "cand_recall", "expected", "candidates", "p50_ms", "p99_ms", "qps"
    );
    println!("{}", "-".repeat(96));
    for r in &results {
        println!(
            "{:>8} {:>4} {:>4} {:>10.4} {:>12.4} {:>12.4} {:>12.1} {:>10.3} {:>10.3} {:>10.0}",
            r.bucket_width,
            r.functions_per_table,
            r.table_count,
            r.mean_recall,
            r.candidate_recall,
            r.expected_recall,
            r.mean_candidates,
            r.p50_latency_ms,
            r.p99_latency_ms,
            r.qps
        );
    }
    println!("{}", "=".repeat(96));

    Ok(())
}

/// Build an index with `config` and measure it against the ground truth.
fn run_benchmark(
    config: &LshConfig,
    dataset: &[Vector],
    queries: &[Vector],
    truth: &[Vec<VectorKey>],
    args: &Args,
    neighbour_distance: f32,
) -> anyhow::Result<BenchmarkResult> {
    let build_start = Instant::now();
    let index = LshIndex::new(config.clone())?;
    index.insert_batch(
        dataset
            .iter()
            .map(|v| (v.key().clone(), v.values().clone())),
    )?;
    let build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

    let options = QueryOptions::new(args.top_k, args.correlation).excluding_self();
    let mut latencies: Vec<Duration> = Vec::with_capacity(queries.len());
    let mut recall_sum = 0.0;
    let mut candidate_sum = 0usize;

    let total_start = Instant::now();
    for (query, truth) in queries.iter().zip(truth) {
        let start = Instant::now();
        let found = index.search(query, &options)?;
        latencies.push(start.elapsed());
        recall_sum += recall_at_k(&found, truth);
    }
    let total_elapsed = total_start.elapsed();

    for query in queries {
        candidate_sum += index.candidates(query.values().clone())?.len();
    }

    latencies.sort();
    let num_queries = queries.len().max(1);

    Ok(BenchmarkResult {
        bucket_width: config.bucket_width,
        functions_per_table: config.functions_per_table,
        table_count: config.table_count,
        top_k: args.top_k,
        num_queries: queries.len(),
        mean_recall: recall_sum / num_queries as f64,
        candidate_recall: candidate_recall(&index, queries, truth)?,
        expected_recall: config.recall_at(neighbour_distance),
        mean_candidates: candidate_sum as f64 / num_queries as f64,
        build_ms,
        p50_latency_ms: percentile_ms(&latencies, 0.5),
        p95_latency_ms: percentile_ms(&latencies, 0.95),
        p99_latency_ms: percentile_ms(&latencies, 0.99),
        qps: queries.len() as f64 / total_elapsed.as_secs_f64().max(f64::EPSILON),
    })
}
