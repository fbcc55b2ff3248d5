//! Typo-tolerant prefix search over entity names via character q-grams.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::merge::merge_frequencies;
use crate::tokenizer::normalize;
use crate::{EntityId, IndexError};

/// One entity as handed to the index: a name with popularity score,
/// descriptive metadata and an optional list of synonyms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub score: i64,
    pub description: String,
    pub wikipedia_url: String,
    pub wikidata_id: String,
    pub synonyms: Vec<String>,
}

impl EntityRecord {
    /// Parses one tab-separated line: `name, score, description,
    /// wikipedia_url, wikidata_id, synonyms` with `;`-separated synonyms.
    /// Trailing columns may be absent and default to empty/zero.
    pub fn parse_tsv(line: &str) -> Result<Self, String> {
        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or("").to_string();
        let score = match fields.next() {
            Some("") | None => 0,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| format!("invalid score {raw:?}"))?,
        };
        let description = fields.next().unwrap_or("").to_string();
        let wikipedia_url = fields.next().unwrap_or("").to_string();
        let wikidata_id = fields.next().unwrap_or("").to_string();
        let synonyms = match fields.next() {
            Some("") | None => Vec::new(),
            Some(raw) => raw.split(';').map(str::to_string).collect(),
        };
        Ok(Self {
            name,
            score,
            description,
            wikipedia_url,
            wikidata_id,
            synonyms,
        })
    }
}

/// One match of a fuzzy prefix query.
///
/// Carries the query-specific metadata (distance, matched synonym) so the
/// shared entity table stays untouched and concurrent queries cannot
/// observe each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// 1-based id into the index's entity table.
    pub entity_id: EntityId,
    /// Prefix edit distance of the winning name or synonym.
    pub distance: u32,
    /// The synonym that matched, when the entity name itself did not.
    pub matched_synonym: Option<String>,
}

/// An entity plus the normalized forms computed once at build time.
#[derive(Debug)]
struct IndexedEntity {
    record: EntityRecord,
    normalized_name: String,
    normalized_synonyms: Vec<String>,
}

/// An immutable q-gram index over entity names.
///
/// Entity ids are 1-based positions in ingestion order; q-gram posting
/// lists are therefore id-ascending by construction. Appends that would
/// duplicate a list's tail (a name and a synonym sharing a q-gram) are
/// skipped to keep the lists strictly increasing.
#[derive(Debug)]
pub struct FuzzyEntityIndex {
    q: usize,
    padding: String,
    with_synonyms: bool,
    inverted_lists: HashMap<String, Vec<EntityId>>,
    entities: Vec<IndexedEntity>,
}

impl FuzzyEntityIndex {
    /// Builds the index from a sequence of entity records.
    pub fn build<I>(records: I, q: usize, with_synonyms: bool) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        if q < 1 {
            return Err(IndexError::InvalidParameter(
                "q must be at least 1".to_string(),
            ));
        }
        let mut index = Self {
            q,
            padding: "$".repeat(q - 1),
            with_synonyms,
            inverted_lists: HashMap::new(),
            entities: Vec::new(),
        };
        for record in records {
            index.add(record);
        }
        Ok(index)
    }

    /// Builds the index from a tab-separated entity file. The first line
    /// is a column header and is skipped; lines with an empty name are
    /// ignored; malformed lines and I/O failures abort the build.
    pub fn from_tsv_file<P: AsRef<Path>>(
        path: P,
        q: usize,
        with_synonyms: bool,
    ) -> Result<Self, IndexError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if number == 0 {
                continue;
            }
            let record =
                EntityRecord::parse_tsv(&line).map_err(|reason| IndexError::Ingestion {
                    line: number + 1,
                    reason,
                })?;
            if !record.name.is_empty() {
                records.push(record);
            }
        }
        let index = Self::build(records, q, with_synonyms)?;
        tracing::debug!(
            entities = index.entities.len(),
            qgrams = index.inverted_lists.len(),
            "built fuzzy index"
        );
        Ok(index)
    }

    fn add(&mut self, record: EntityRecord) {
        let id = self.entities.len() as EntityId + 1;
        let normalized_name = normalize(&record.name);
        self.add_qgrams(&normalized_name, id);

        let mut normalized_synonyms = Vec::with_capacity(record.synonyms.len());
        for synonym in &record.synonyms {
            let normalized = normalize(synonym);
            if self.with_synonyms {
                self.add_qgrams(&normalized, id);
            }
            normalized_synonyms.push(normalized);
        }

        self.entities.push(IndexedEntity {
            record,
            normalized_name,
            normalized_synonyms,
        });
    }

    fn add_qgrams(&mut self, normalized: &str, id: EntityId) {
        for qgram in self.qgrams(normalized) {
            let list = self.inverted_lists.entry(qgram).or_default();
            if list.last() != Some(&id) {
                list.push(id);
            }
        }
    }

    /// All q-grams of an already normalized string, padded with `q - 1`
    /// leading `$` characters.
    fn qgrams(&self, normalized: &str) -> Vec<String> {
        let padded: Vec<char> = self.padding.chars().chain(normalized.chars()).collect();
        padded
            .windows(self.q)
            .map(|window| window.iter().collect())
            .collect()
    }

    /// Finds all entities whose name (or synonym, when enabled) is within
    /// prefix edit distance `delta` of `prefix`.
    ///
    /// Candidates are drawn from a frequency merge of the query's q-gram
    /// posting lists; any candidate sharing fewer than `|prefix| - q*delta`
    /// q-grams with the query cannot be within `delta` and is skipped
    /// without an edit-distance computation. Matches come back ranked by
    /// ascending distance, then descending popularity score; the second
    /// element of the returned pair counts the edit-distance computations
    /// actually performed.
    pub fn find_matches(&self, prefix: &str, delta: u32) -> (Vec<MatchResult>, usize) {
        let prefix = normalize(prefix);
        if prefix.is_empty() {
            return (Vec::new(), 0);
        }
        let threshold = prefix.len() as i64 - (self.q as i64 * i64::from(delta));

        let qgrams = self.qgrams(&prefix);
        let lists: Vec<&[EntityId]> = qgrams
            .iter()
            .filter_map(|qgram| self.inverted_lists.get(qgram).map(Vec::as_slice))
            .collect();

        let mut matches = Vec::new();
        let mut ped_computations = 0usize;
        for (id, frequency) in merge_frequencies(&lists) {
            if i64::from(frequency) < threshold {
                continue;
            }
            let entity = &self.entities[(id - 1) as usize];

            let ped = prefix_edit_distance(&prefix, &entity.normalized_name, delta);
            ped_computations += 1;
            if ped <= delta {
                matches.push(MatchResult {
                    entity_id: id,
                    distance: ped,
                    matched_synonym: None,
                });
                continue;
            }

            if self.with_synonyms {
                let mut best: Option<(u32, usize)> = None;
                for (position, synonym) in entity.normalized_synonyms.iter().enumerate() {
                    let syn_ped = prefix_edit_distance(&prefix, synonym, delta);
                    ped_computations += 1;
                    if syn_ped <= delta && best.map_or(true, |(b, _)| syn_ped < b) {
                        best = Some((syn_ped, position));
                    }
                }
                if let Some((distance, position)) = best {
                    matches.push(MatchResult {
                        entity_id: id,
                        distance,
                        matched_synonym: Some(entity.record.synonyms[position].clone()),
                    });
                }
            }
        }

        // Stable sort: remaining ties keep ascending-id candidate order.
        matches.sort_by(|a, b| {
            a.distance.cmp(&b.distance).then_with(|| {
                self.entity(b.entity_id)
                    .score
                    .cmp(&self.entity(a.entity_id).score)
            })
        });
        (matches, ped_computations)
    }

    /// The entity behind a match. Ids are 1-based.
    pub fn entity(&self, id: EntityId) -> &EntityRecord {
        &self.entities[(id - 1) as usize].record
    }

    /// The posting list of a q-gram, or `None` if no entity contains it.
    pub fn qgram_list(&self, qgram: &str) -> Option<&[EntityId]> {
        self.inverted_lists.get(qgram).map(Vec::as_slice)
    }

    /// Iterates over all q-gram posting lists.
    pub fn qgram_lists(&self) -> impl Iterator<Item = (&str, &[EntityId])> {
        self.inverted_lists
            .iter()
            .map(|(qgram, list)| (qgram.as_str(), list.as_slice()))
    }

    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn q(&self) -> usize {
        self.q
    }

    pub fn with_synonyms(&self) -> bool {
        self.with_synonyms
    }
}

/// Prefix edit distance between `x` and `y`: the minimum unit-cost edit
/// distance between `x` and any prefix of `y`, capped at `delta + 1`.
///
/// The cap is a sentinel for "no match within budget", callers must not
/// read it as a literal distance. Only the first `|x| + delta` characters
/// of `y` can take part in a qualifying prefix, so the DP table is bounded
/// to that many columns; two rolling rows replace the full matrix.
pub fn prefix_edit_distance(x: &str, y: &str, delta: u32) -> u32 {
    let x: Vec<char> = x.chars().collect();
    let y: Vec<char> = y.chars().collect();
    let rows = x.len() + 1;
    let cols = (x.len() + delta as usize + 1).min(y.len() + 1);

    let mut previous: Vec<u32> = (0..cols as u32).collect();
    let mut current = vec![0u32; cols];
    for i in 1..rows {
        current[0] = i as u32;
        for j in 1..cols {
            let substitute = previous[j - 1] + u32::from(x[i - 1] != y[j - 1]);
            let insert = current[j - 1] + 1;
            let delete = previous[j] + 1;
            current[j] = substitute.min(insert).min(delete);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    // The best match may end at any prefix of y, so take the minimum over
    // the whole last row, not just the final cell.
    let minimum = previous.into_iter().min().unwrap_or(delta + 1);
    minimum.min(delta + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ped_exact_prefix_is_zero() {
        assert_eq!(prefix_edit_distance("foo", "foobar", 0), 0);
        assert_eq!(prefix_edit_distance("frei", "freiburg", 0), 0);
    }

    #[test]
    fn ped_caps_at_delta_plus_one() {
        assert_eq!(prefix_edit_distance("xyz", "abc", 1), 2);
        assert_eq!(prefix_edit_distance("abc", "", 1), 2);
    }

    #[test]
    fn ped_counts_single_edits() {
        // One deletion of the trailing character.
        assert_eq!(prefix_edit_distance("freib", "frei", 1), 1);
        // One deletion inside the prefix.
        assert_eq!(prefix_edit_distance("kfc", "kc", 1), 1);
        // One substitution.
        assert_eq!(prefix_edit_distance("frwi", "freiburg", 2), 1);
    }

    #[test]
    fn ped_empty_query_matches_everything() {
        assert_eq!(prefix_edit_distance("", "anything", 3), 0);
    }

    #[test]
    fn parse_tsv_full_line() {
        let record = EntityRecord::parse_tsv(
            "KFC\t90\tFast food chain\thttps://en.wikipedia.org/wiki/KFC\tQ524757\tKentucky Fried Chicken;K.F.C",
        )
        .unwrap();
        assert_eq!(record.name, "KFC");
        assert_eq!(record.score, 90);
        assert_eq!(
            record.synonyms,
            vec!["Kentucky Fried Chicken".to_string(), "K.F.C".to_string()]
        );
    }

    #[test]
    fn parse_tsv_missing_trailing_columns() {
        let record = EntityRecord::parse_tsv("Solo name").unwrap();
        assert_eq!(record.name, "Solo name");
        assert_eq!(record.score, 0);
        assert!(record.description.is_empty());
        assert!(record.synonyms.is_empty());
    }

    #[test]
    fn parse_tsv_rejects_bad_score() {
        assert!(EntityRecord::parse_tsv("Name\tnot-a-number").is_err());
    }
}
