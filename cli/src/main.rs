mod eval;

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use cinesearch_core::{Bm25Params, RankedTextIndex};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cinesearch")]
#[command(about = "Ranked keyword search over line-oriented text records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and answer keyword queries from stdin
    Query {
        /// Record file, one document per line
        #[arg(long)]
        records: String,
        /// BM25 length-normalization coefficient
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        /// BM25 saturation coefficient
        #[arg(long, default_value_t = 1.75)]
        k: f64,
        /// Number of results to print per query
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Evaluate the ranked engine against a benchmark file
    Evaluate {
        /// Record file, one document per line
        #[arg(long)]
        records: String,
        /// Benchmark file: query<TAB>space-separated relevant ids
        #[arg(long)]
        benchmark: String,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        #[arg(long, default_value_t = 1.75)]
        k: f64,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { records, b, k, top } => run_query(&records, b, k, top),
        Commands::Evaluate {
            records,
            benchmark,
            b,
            k,
        } => run_evaluate(&records, &benchmark, b, k),
    }
}

fn build_index(records: &str, b: f64, k: f64) -> Result<RankedTextIndex> {
    let params = Bm25Params::new(b, k)?;
    let start = Instant::now();
    let index = RankedTextIndex::from_file(records, params)
        .with_context(|| format!("building index from {records}"))?;
    tracing::info!(
        records = index.num_records(),
        took_ms = start.elapsed().as_millis() as u64,
        "index built"
    );
    Ok(index)
}

fn run_query(records: &str, b: f64, k: f64, top: usize) -> Result<()> {
    let index = build_index(records, b, k)?;
    // Keep the raw lines so hits can echo their text; record ids are
    // 1-based line numbers.
    let lines: Vec<String> = std::fs::read_to_string(records)?
        .lines()
        .map(str::to_string)
        .collect();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    write!(stdout, "query> ")?;
    stdout.flush()?;
    for input in stdin.lock().lines() {
        let input = input?;
        let query = input.trim();
        if !query.is_empty() {
            let hits = index.query(query);
            if hits.is_empty() {
                writeln!(stdout, "no records found")?;
            }
            for (rank, posting) in hits.iter().take(top).enumerate() {
                let text = lines
                    .get((posting.record_id - 1) as usize)
                    .map(String::as_str)
                    .unwrap_or("");
                writeln!(
                    stdout,
                    "{:>2}. [{}] {:.3}  {}",
                    rank + 1,
                    posting.record_id,
                    posting.weight,
                    text
                )?;
            }
        }
        write!(stdout, "query> ")?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_evaluate(records: &str, benchmark: &str, b: f64, k: f64) -> Result<()> {
    let index = build_index(records, b, k)?;
    let benchmark = eval::read_benchmark(benchmark)?;
    let start = Instant::now();
    let summary = eval::evaluate(&index, &benchmark);
    tracing::info!(
        queries = benchmark.len(),
        took_ms = start.elapsed().as_millis() as u64,
        "benchmark evaluated"
    );
    println!(
        "MP@3: {:.3}  MP@R: {:.3}  MAP: {:.3}",
        summary.mp_at_3, summary.mp_at_r, summary.map
    );
    Ok(())
}
