//! Serializable full-text index over extracted documents.
//!
//! - [`tokenizer`]: separator-driven term splitting
//! - [`query`]: query string syntax (`+required -prohibited field:term pre*`)
//! - [`index`]: BM25 index builder, search, JSON persistence

pub mod index;
pub mod query;
pub mod tokenizer;

pub use index::{FORMAT_VERSION, FieldSpec, Hit, IndexBuilder, MatchData, SearchIndex};
pub use query::{Clause, Presence, parse_query};
pub use tokenizer::{DEFAULT_SEPARATOR, Tokenizer};
