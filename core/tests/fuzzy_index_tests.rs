use cinesearch_core::{EntityRecord, FuzzyEntityIndex, IndexError};

fn entity(name: &str, score: i64, synonyms: &[&str]) -> EntityRecord {
    EntityRecord {
        name: name.to_string(),
        score,
        description: format!("{name} description"),
        wikipedia_url: format!("https://en.wikipedia.org/wiki/{name}"),
        wikidata_id: String::new(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

fn chains_index(with_synonyms: bool) -> FuzzyEntityIndex {
    let records = vec![
        entity("KFC", 90, &[]),
        entity("K.F.C", 50, &[]),
        entity("Kentucky Fried Chicken", 70, &["KFC"]),
        entity("Kafec", 10, &[]),
    ];
    FuzzyEntityIndex::build(records, 3, with_synonyms).unwrap()
}

#[test]
fn exact_prefix_match_ranked_by_popularity() {
    let index = chains_index(false);
    let (matches, ped_computations) = index.find_matches("kfc", 0);

    // "KFC" and "K.F.C" normalize to "kfc" and share all 3 q-grams;
    // "Kentucky Fried Chicken" shares only "$$k" and "Kafec" only "$$k",
    // both below the threshold |x| - q*delta = 3, so neither costs a PED
    // computation.
    assert_eq!(ped_computations, 2);
    assert_eq!(matches.len(), 2);
    assert_eq!(index.entity(matches[0].entity_id).name, "KFC");
    assert_eq!(index.entity(matches[1].entity_id).name, "K.F.C");
    assert_eq!(matches[0].distance, 0);
    assert_eq!(matches[0].matched_synonym, None);
}

#[test]
fn delta_too_small_to_bridge_two_edits() {
    let index = chains_index(false);

    // PED("kfc", "kafec") = 2: with delta = 1 the candidate survives the
    // q-gram threshold (3 - 3*1 = 0) but fails the distance check.
    let (matches, _) = index.find_matches("kfc", 1);
    assert!(matches
        .iter()
        .all(|m| index.entity(m.entity_id).name != "Kafec"));

    // With delta = 2 the two edits fit the budget.
    let (matches, _) = index.find_matches("kfc", 2);
    let kafec = matches
        .iter()
        .find(|m| index.entity(m.entity_id).name == "Kafec")
        .expect("Kafec within distance 2");
    assert_eq!(kafec.distance, 2);
}

#[test]
fn synonym_matching_reports_the_winning_synonym() {
    let records = vec![
        entity("The Big Lemon", 40, &["Big Lemon", "TBL"]),
        entity("Big Apple Pictures", 60, &[]),
    ];
    let index = FuzzyEntityIndex::build(records, 3, true).unwrap();

    // "biglemo" is 3 edits from any prefix of "thebiglemon" but 0 edits
    // from the prefix of synonym "Big Lemon".
    let (matches, _) = index.find_matches("big lemo", 1);
    assert_eq!(matches.len(), 1);
    assert_eq!(index.entity(matches[0].entity_id).name, "The Big Lemon");
    assert_eq!(matches[0].distance, 0);
    assert_eq!(matches[0].matched_synonym.as_deref(), Some("Big Lemon"));
}

#[test]
fn synonyms_ignored_when_disabled() {
    let records = vec![entity("The Big Lemon", 40, &["Big Lemon"])];
    let index = FuzzyEntityIndex::build(records, 3, false).unwrap();
    let (matches, _) = index.find_matches("big lemo", 1);
    assert!(matches.is_empty());
}

#[test]
fn matches_rank_by_distance_then_popularity() {
    let records = vec![
        entity("Freiburg", 30, &[]),
        entity("Freiberg", 80, &[]),
        entity("Fribourg", 55, &[]),
    ];
    let index = FuzzyEntityIndex::build(records, 3, false).unwrap();

    let (matches, _) = index.find_matches("freibu", 2);
    let names: Vec<&str> = matches
        .iter()
        .map(|m| index.entity(m.entity_id).name.as_str())
        .collect();
    // Freiburg at distance 0; Freiberg (1 substitution) beats Fribourg
    // (2 edits).
    assert_eq!(names, vec!["Freiburg", "Freiberg", "Fribourg"]);
    assert_eq!(
        matches.iter().map(|m| m.distance).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn find_matches_is_idempotent() {
    let index = chains_index(true);
    let first = index.find_matches("kfc", 1);
    let second = index.find_matches("kfc", 1);
    assert_eq!(first, second);
}

#[test]
fn empty_prefix_yields_nothing() {
    let index = chains_index(false);
    let (matches, ped_computations) = index.find_matches("", 2);
    assert!(matches.is_empty());
    assert_eq!(ped_computations, 0);
    // Normalization can empty a non-empty prefix.
    let (matches, _) = index.find_matches("!?.", 2);
    assert!(matches.is_empty());
}

#[test]
fn empty_index_is_a_valid_degenerate_state() {
    let index = FuzzyEntityIndex::build(std::iter::empty(), 3, true).unwrap();
    assert_eq!(index.num_entities(), 0);
    let (matches, ped_computations) = index.find_matches("kfc", 2);
    assert!(matches.is_empty());
    assert_eq!(ped_computations, 0);
}

#[test]
fn qgram_lists_stay_strictly_increasing_with_shared_grams() {
    // Name and synonym share q-grams; repeated grams within one name
    // ("ana" twice in "banana") must not duplicate the id either.
    let records = vec![
        entity("Banana", 10, &["Banana Republic"]),
        entity("Bandana", 20, &[]),
    ];
    let index = FuzzyEntityIndex::build(records, 3, true).unwrap();
    for (qgram, list) in index.qgram_lists() {
        assert!(
            list.windows(2).all(|w| w[0] < w[1]),
            "q-gram list for {qgram:?} is not strictly increasing: {list:?}"
        );
    }
    assert_eq!(index.qgram_list("ana"), Some(&[1u32, 2][..]));
    assert_eq!(index.qgram_list("$ba"), Some(&[1u32, 2][..]));
}

#[test]
fn q_below_one_is_rejected() {
    let err = FuzzyEntityIndex::build(std::iter::empty(), 0, false).unwrap_err();
    assert!(matches!(err, IndexError::InvalidParameter(_)));
}

#[test]
fn tsv_ingestion_skips_header_and_surfaces_bad_lines() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.tsv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "name\tscore\tdescription\twikipedia_url\twikidata_id\tsynonyms").unwrap();
    writeln!(file, "KFC\t90\tFast food chain\thttps://en.wikipedia.org/wiki/KFC\tQ524757\tKentucky Fried Chicken;K.F.C").unwrap();
    writeln!(file, "Short line").unwrap();
    drop(file);

    let index = FuzzyEntityIndex::from_tsv_file(&path, 3, true).unwrap();
    assert_eq!(index.num_entities(), 2);
    assert_eq!(index.entity(1).score, 90);
    assert_eq!(index.entity(2).name, "Short line");
    assert_eq!(index.entity(2).score, 0);

    let bad = dir.path().join("bad.tsv");
    let mut file = std::fs::File::create(&bad).unwrap();
    writeln!(file, "header").unwrap();
    writeln!(file, "Name\tNaN-score").unwrap();
    drop(file);
    let err = FuzzyEntityIndex::from_tsv_file(&bad, 3, true).unwrap_err();
    assert!(matches!(err, IndexError::Ingestion { line: 2, .. }));
}
