//! Benchmark evaluation for the ranked engine: MP@3, MP@R and MAP over a
//! file of queries with known relevant record ids. The ranked output is
//! treated as an opaque ordered id list.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use cinesearch_core::{RankedTextIndex, RecordId};

/// Mean precision measures over all benchmark queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalSummary {
    pub mp_at_3: f64,
    pub mp_at_r: f64,
    pub map: f64,
}

/// Reads a benchmark file: one `query<TAB>id id id...` line per query.
pub fn read_benchmark<P: AsRef<Path>>(path: P) -> Result<HashMap<String, HashSet<RecordId>>> {
    let reader = BufReader::new(
        File::open(path.as_ref())
            .with_context(|| format!("opening benchmark {}", path.as_ref().display()))?,
    );
    let mut benchmark = HashMap::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some((query, ids)) = line.split_once('\t') else {
            bail!("benchmark line {}: missing tab separator", number + 1);
        };
        let relevant = ids
            .split_whitespace()
            .map(|id| {
                id.parse::<RecordId>()
                    .with_context(|| format!("benchmark line {}: bad id {id:?}", number + 1))
            })
            .collect::<Result<HashSet<RecordId>>>()?;
        benchmark.insert(query.to_string(), relevant);
    }
    Ok(benchmark)
}

/// Precision among the first `k` results. Divides by `k` even when fewer
/// results exist, missing results count as misses.
pub fn precision_at_k(result_ids: &[RecordId], relevant: &HashSet<RecordId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = result_ids
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id))
        .count();
    hits as f64 / k as f64
}

/// Average precision: mean of the precision at each relevant hit's rank,
/// over the number of relevant ids.
pub fn average_precision(result_ids: &[RecordId], relevant: &HashSet<RecordId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut accumulated = 0.0;
    for (rank, id) in result_ids.iter().enumerate() {
        if relevant.contains(id) {
            hits += 1;
            accumulated += hits as f64 / (rank + 1) as f64;
        }
    }
    accumulated / relevant.len() as f64
}

/// Runs every benchmark query through the index and aggregates P@3, P@R
/// and AP into their means.
pub fn evaluate(index: &RankedTextIndex, benchmark: &HashMap<String, HashSet<RecordId>>) -> EvalSummary {
    let mut p_at_3 = 0.0;
    let mut p_at_r = 0.0;
    let mut ap = 0.0;
    for (query, relevant) in benchmark {
        let result_ids: Vec<RecordId> = index
            .query(query)
            .into_iter()
            .map(|posting| posting.record_id)
            .collect();
        p_at_3 += precision_at_k(&result_ids, relevant, 3);
        p_at_r += precision_at_k(&result_ids, relevant, relevant.len());
        ap += average_precision(&result_ids, relevant);
    }
    let queries = benchmark.len().max(1) as f64;
    EvalSummary {
        mp_at_3: p_at_3 / queries,
        mp_at_r: p_at_r / queries,
        map: ap / queries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relevant(ids: &[RecordId]) -> HashSet<RecordId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn precision_at_k_counts_hits_in_window() {
        let results = vec![5, 3, 6, 1, 2];
        let rel = relevant(&[1, 2, 5, 6, 7, 8]);
        assert_eq!(precision_at_k(&results, &rel, 2), 0.5);
        assert_eq!(precision_at_k(&results, &rel, 4), 0.75);
        // Fewer results than k: denominator stays k.
        assert_eq!(precision_at_k(&results, &rel, 8), 0.5);
    }

    #[test]
    fn average_precision_hand_checked() {
        // Hits at ranks 1, 3 and 5 of 5 relevant ids:
        // (1/1 + 2/3 + 3/5) / 5.
        let results = vec![7, 17, 9, 42, 5];
        let rel = relevant(&[5, 7, 9, 11, 12]);
        let expected = (1.0 + 2.0 / 3.0 + 3.0 / 5.0) / 5.0;
        assert!((average_precision(&results, &rel) - expected).abs() < 1e-12);
    }

    #[test]
    fn average_precision_no_hits() {
        assert_eq!(average_precision(&[1, 2, 3], &relevant(&[9])), 0.0);
    }

    #[test]
    fn evaluate_aggregates_means() {
        use cinesearch_core::{Bm25Params, RankedTextIndex};

        let index = RankedTextIndex::build(
            ["movie action hero", "movie space drama"],
            Bm25Params::default(),
        );
        let mut benchmark = HashMap::new();
        benchmark.insert("action".to_string(), relevant(&[1]));
        benchmark.insert("space".to_string(), relevant(&[2]));
        let summary = evaluate(&index, &benchmark);
        // Each query returns exactly its one relevant record.
        assert!((summary.mp_at_3 - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.mp_at_r, 1.0);
        assert_eq!(summary.map, 1.0);
    }
}
