//! In-memory search engines for short text records.
//!
//! Two sibling engines built on the same inverted-list idea:
//!
//! - [`RankedTextIndex`]: BM25-weighted keyword search over free text.
//! - [`FuzzyEntityIndex`]: typo-tolerant prefix search over entity names
//!   via character q-grams and bounded prefix edit distance.
//!
//! Both indexes are built once from a static input and are immutable
//! afterwards, so a built index can be shared freely across threads.

pub mod error;
pub mod fuzzy;
pub mod merge;
pub mod ranked;
pub mod tokenizer;

pub use error::IndexError;
pub use fuzzy::{EntityRecord, FuzzyEntityIndex, MatchResult};
pub use merge::Posting;
pub use ranked::{Bm25Params, RankedTextIndex};

/// 1-based identifier of a text record in a [`RankedTextIndex`].
pub type RecordId = u32;

/// 1-based identifier of an entity in a [`FuzzyEntityIndex`].
pub type EntityId = u32;
