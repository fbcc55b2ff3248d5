//! BM25-ranked keyword search over line-oriented text records.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::merge::{merge_scored, round3, Posting};
use crate::tokenizer::tokenize;
use crate::{IndexError, RecordId};

/// BM25 weighting coefficients.
///
/// `b` controls document-length normalization (0 = none, 1 = full), `k`
/// controls term-frequency saturation. `k = +inf` together with `b = 0`
/// disables saturation entirely and the index degenerates to classic
/// TF-IDF weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    b: f64,
    k: f64,
}

impl Bm25Params {
    pub fn new(b: f64, k: f64) -> Result<Self, IndexError> {
        if !(0.0..=1.0).contains(&b) {
            return Err(IndexError::InvalidParameter(format!(
                "b must be within [0, 1], got {b}"
            )));
        }
        if k.is_nan() || k < 0.0 {
            return Err(IndexError::InvalidParameter(format!(
                "k must be non-negative, got {k}"
            )));
        }
        Ok(Self { b, k })
    }

    /// Classic TF-IDF: no saturation, no length normalization.
    pub fn tf_idf() -> Self {
        Self {
            b: 0.0,
            k: f64::INFINITY,
        }
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn k(&self) -> f64 {
        self.k
    }
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { b: 0.75, k: 1.75 }
    }
}

/// An immutable inverted index over text records, one posting list per
/// term, weighted with BM25 scores at build time.
///
/// Records get 1-based ids in ingestion order, which also keeps every
/// posting list sorted by record id without an explicit sort. Queries
/// never mutate the index, so a built index can serve concurrent readers.
pub struct RankedTextIndex {
    params: Bm25Params,
    inverted_lists: HashMap<String, Vec<Posting>>,
    num_records: u32,
    avg_doc_len: f64,
}

impl RankedTextIndex {
    /// Builds the index from one text record per item.
    ///
    /// First pass accumulates raw term frequencies (bumping the tail
    /// posting when a term repeats within a record), second pass rewrites
    /// every weight with the BM25 formula over the finished corpus
    /// statistics.
    pub fn build<I, S>(records: I, params: Bm25Params) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inverted_lists: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths: Vec<u32> = Vec::new();
        let mut record_id: RecordId = 0;

        for record in records {
            record_id += 1;
            let tokens = tokenize(record.as_ref());
            doc_lengths.push(tokens.len() as u32);
            for token in tokens {
                let list = inverted_lists.entry(token).or_default();
                match list.last_mut() {
                    Some(last) if last.record_id == record_id => last.weight += 1.0,
                    _ => list.push(Posting {
                        record_id,
                        weight: 1.0,
                    }),
                }
            }
        }

        let num_records = record_id;
        let total_len: u64 = doc_lengths.iter().map(|&l| u64::from(l)).sum();
        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            total_len as f64 / doc_lengths.len() as f64
        };

        let plain_tf_idf = params.k.is_infinite() && params.b == 0.0;
        for list in inverted_lists.values_mut() {
            let df = list.len() as f64;
            let idf = (f64::from(num_records) / df).log2();
            for posting in list.iter_mut() {
                let tf = posting.weight;
                let weight = if plain_tf_idf {
                    tf * idf
                } else {
                    let dl = f64::from(doc_lengths[(posting.record_id - 1) as usize]);
                    let tf_star = tf * (params.k + 1.0)
                        / (params.k * (1.0 - params.b + params.b * dl / avg_doc_len) + tf);
                    tf_star * idf
                };
                posting.weight = round3(weight);
            }
        }

        Self {
            params,
            inverted_lists,
            num_records,
            avg_doc_len,
        }
    }

    /// Builds the index from a file with one record per line. I/O errors
    /// abort the build; a partially read corpus is never indexed.
    pub fn from_file<P: AsRef<Path>>(path: P, params: Bm25Params) -> Result<Self, IndexError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let records = reader
            .lines()
            .collect::<Result<Vec<String>, std::io::Error>>()?;
        let index = Self::build(records, params);
        tracing::debug!(
            records = index.num_records,
            terms = index.inverted_lists.len(),
            "built ranked index"
        );
        Ok(index)
    }

    /// Answers a keyword query: look up each whitespace-separated term
    /// (lowercased; unknown terms contribute an empty list), merge the
    /// posting lists pairwise with score-sum semantics, and sort by weight
    /// descending, ties by ascending record id.
    pub fn query(&self, query_text: &str) -> Vec<Posting> {
        let terms: Vec<String> = query_text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let Some(first) = terms.first() else {
            return Vec::new();
        };

        let mut result: Vec<Posting> = self
            .posting_list(first)
            .map(|list| list.to_vec())
            .unwrap_or_default();
        for term in &terms[1..] {
            let list = self.posting_list(term).unwrap_or(&[]);
            result = merge_scored(&result, list);
        }

        result.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        result
    }

    /// The posting list for a term, or `None` if the term is not indexed.
    pub fn posting_list(&self, term: &str) -> Option<&[Posting]> {
        self.inverted_lists.get(term).map(Vec::as_slice)
    }

    /// Iterates over all indexed terms, in no particular order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.inverted_lists.keys().map(String::as_str)
    }

    pub fn num_records(&self) -> u32 {
        self.num_records
    }

    pub fn avg_doc_len(&self) -> f64 {
        self.avg_doc_len
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }
}
