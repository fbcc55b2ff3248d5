//! Posting-list merges shared by both engines.
//!
//! Every input list must be sorted by id with no duplicates; every output
//! is a freshly allocated list with the same invariant. Merges never hand
//! back references into a stored list and never mutate their inputs, so an
//! index stays untouched under any number of concurrent queries.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::{EntityId, RecordId};

/// One entry of a scored posting list: a record and its term weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub record_id: RecordId,
    pub weight: f64,
}

/// Round a score to 3 decimal places.
///
/// Applied to every stored weight and to every sum produced by
/// [`merge_scored`], which keeps rankings reproducible across merge
/// orderings. Weights that pass through a merge untouched are not
/// re-rounded.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Union of two scored posting lists. Ids present in both contribute the
/// rounded sum of their weights; ids present in one pass through unchanged.
/// Linear two-pointer merge, O(|left| + |right|).
pub fn merge_scored(left: &[Posting], right: &[Posting]) -> Vec<Posting> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut i = 0;
    let mut j = 0;
    while i < left.len() && j < right.len() {
        match left[i].record_id.cmp(&right[j].record_id) {
            Ordering::Equal => {
                merged.push(Posting {
                    record_id: left[i].record_id,
                    weight: round3(left[i].weight + right[j].weight),
                });
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                merged.push(left[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(right[j]);
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

/// K-way merge of id-sorted lists into `(id, frequency)` pairs, where the
/// frequency counts how many of the input lists contain the id. The same
/// list passed twice counts twice, which is exactly what a repeated query
/// q-gram needs.
///
/// Classic heap merge keyed on `(id, source list)`: pull the minimum,
/// extend or open a run, refill from the source the minimum came from.
/// O(N log k) for N total entries across k lists.
pub fn merge_frequencies(lists: &[&[EntityId]]) -> Vec<(EntityId, u32)> {
    let mut heap = BinaryHeap::with_capacity(lists.len());
    let mut cursors = vec![0usize; lists.len()];
    for (source, list) in lists.iter().enumerate() {
        if let Some(&first) = list.first() {
            heap.push(Reverse((first, source)));
            cursors[source] = 1;
        }
    }

    let mut merged: Vec<(EntityId, u32)> = Vec::new();
    while let Some(Reverse((id, source))) = heap.pop() {
        match merged.last_mut() {
            Some(run) if run.0 == id => run.1 += 1,
            _ => merged.push((id, 1)),
        }
        if let Some(&next) = lists[source].get(cursors[source]) {
            heap.push(Reverse((next, source)));
            cursors[source] += 1;
        }
    }
    merged
}
