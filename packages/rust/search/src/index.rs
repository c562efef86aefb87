//! Field-weighted BM25 inverted index.
//!
//! [`IndexBuilder`] collects documents; [`SearchIndex`] is the immutable,
//! serializable result that answers queries.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use siteindex_shared::{DocumentRecord, Result, SiteIndexError};

use crate::query::{Clause, Presence, parse_query};
use crate::tokenizer::Tokenizer;

/// Serialized format version written into every index.
pub const FORMAT_VERSION: u32 = 1;

/// BM25 term-frequency saturation.
const K1: f32 = 1.2;

/// BM25 length normalization.
const B: f32 = 0.75;

// ============================================================================
// Public types
// ============================================================================

/// An indexed field and its score multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub boost: f32,
}

/// One entry of a term's posting list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// Which query terms matched which fields of a hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchData {
    /// Term -> fields it matched in.
    pub metadata: BTreeMap<String, BTreeSet<String>>,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    /// Id of the matching document.
    #[serde(rename = "ref")]
    pub doc_ref: String,
    pub score: f32,
    pub match_data: MatchData,
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// Accumulates documents into an inverted index.
///
/// Declare fields before adding documents. Without declared fields every
/// open field of every document is indexed with boost 1.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    tokenizer: Tokenizer,
    fields: Vec<FieldSpec>,
    seen_fields: BTreeSet<String>,
    refs: Vec<String>,
    field_lengths: Vec<BTreeMap<String, u32>>,
    postings: BTreeMap<String, BTreeMap<String, Vec<Posting>>>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `name` with boost 1.
    pub fn field(&mut self, name: impl Into<String>) -> &mut Self {
        self.field_with_boost(name, 1.0)
    }

    /// Index `name`, multiplying its term scores by `boost`.
    pub fn field_with_boost(&mut self, name: impl Into<String>, boost: f32) -> &mut Self {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.boost = boost,
            None => self.fields.push(FieldSpec { name, boost }),
        }
        self
    }

    /// Split terms on `pattern` (a regex) instead of whitespace and hyphens.
    pub fn separator(&mut self, pattern: &str) -> Result<&mut Self> {
        self.tokenizer = Tokenizer::new(pattern)?;
        Ok(self)
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Add one document. Its `id` is the ref returned in hits.
    pub fn add(&mut self, doc: &DocumentRecord) {
        let doc_index = self.refs.len() as u32;
        self.refs.push(doc.id.clone());

        let values: Vec<(String, &str)> = if self.fields.is_empty() {
            doc.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.as_str()))
                .collect()
        } else {
            self.fields
                .iter()
                .filter_map(|f| doc.get(&f.name).map(|value| (f.name.clone(), value)))
                .collect()
        };

        let mut lengths = BTreeMap::new();
        for (field, value) in values {
            let tokens = self.tokenizer.tokenize(value);
            lengths.insert(field.clone(), tokens.len() as u32);

            let mut term_freqs: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_default() += 1;
            }
            for (term, tf) in term_freqs {
                self.postings
                    .entry(term)
                    .or_default()
                    .entry(field.clone())
                    .or_default()
                    .push(Posting { doc: doc_index, tf });
            }
            self.seen_fields.insert(field);
        }
        self.field_lengths.push(lengths);
    }

    /// Freeze the collected documents into a queryable index.
    pub fn build(self) -> SearchIndex {
        let fields = if self.fields.is_empty() {
            self.seen_fields
                .into_iter()
                .map(|name| FieldSpec { name, boost: 1.0 })
                .collect()
        } else {
            self.fields
        };

        let mut avg_field_length = BTreeMap::new();
        for field in &fields {
            let lengths: Vec<u32> = self
                .field_lengths
                .iter()
                .filter_map(|l| l.get(&field.name).copied())
                .collect();
            let avg = if lengths.is_empty() {
                0.0
            } else {
                lengths.iter().sum::<u32>() as f32 / lengths.len() as f32
            };
            avg_field_length.insert(field.name.clone(), avg);
        }

        debug!(
            documents = self.refs.len(),
            terms = self.postings.len(),
            fields = fields.len(),
            "search index built"
        );

        SearchIndex {
            version: FORMAT_VERSION,
            separator: self.tokenizer.pattern().to_string(),
            fields,
            refs: self.refs,
            field_lengths: self.field_lengths,
            avg_field_length,
            postings: self.postings,
            tokenizer: self.tokenizer,
        }
    }
}

// ============================================================================
// SearchIndex
// ============================================================================

/// Immutable inverted index, serializable to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    version: u32,
    separator: String,
    fields: Vec<FieldSpec>,
    refs: Vec<String>,
    field_lengths: Vec<BTreeMap<String, u32>>,
    avg_field_length: BTreeMap<String, f32>,
    postings: BTreeMap<String, BTreeMap<String, Vec<Posting>>>,
    #[serde(skip)]
    tokenizer: Tokenizer,
}

impl SearchIndex {
    /// Load an index previously produced by [`SearchIndex::to_json`].
    pub fn load(json: &str) -> Result<Self> {
        let mut index: SearchIndex = serde_json::from_str(json)
            .map_err(|e| SiteIndexError::parse(format!("invalid search index: {e}")))?;

        if index.version != FORMAT_VERSION {
            return Err(SiteIndexError::validation(format!(
                "unsupported search index version: {} (expected {FORMAT_VERSION})",
                index.version
            )));
        }

        index.check_consistency()?;
        index.tokenizer = Tokenizer::new(&index.separator)?;
        Ok(index)
    }

    /// Every posting must point at a known document.
    fn check_consistency(&self) -> Result<()> {
        let docs = self.refs.len();
        if self.field_lengths.len() != docs {
            return Err(SiteIndexError::parse(format!(
                "invalid search index: {} field length entries for {docs} documents",
                self.field_lengths.len()
            )));
        }

        let dangling = self
            .postings
            .iter()
            .flat_map(|(term, by_field)| by_field.values().flatten().map(move |p| (term, p.doc)))
            .find(|(_, doc)| *doc as usize >= docs);
        if let Some((term, doc)) = dangling {
            return Err(SiteIndexError::parse(format!(
                "invalid search index: posting for {term:?} points at document {doc} of {docs}"
            )));
        }
        Ok(())
    }

    /// Load from raw bytes (UTF-8 JSON).
    pub fn load_slice(bytes: &[u8]) -> Result<Self> {
        let json = std::str::from_utf8(bytes)
            .map_err(|e| SiteIndexError::parse(format!("search index is not UTF-8: {e}")))?;
        Self::load(json)
    }

    /// Serialize to the JSON blob persisted as `idx.json`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SiteIndexError::parse(format!("failed to serialize search index: {e}")))
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Run `query`, returning hits by descending score (ties by ref).
    ///
    /// A query without any optional or required clause matches nothing.
    pub fn search(&self, query: &str) -> Vec<Hit> {
        let clauses = parse_query(query, &self.tokenizer);

        let mut scores: HashMap<u32, f32> = HashMap::new();
        let mut matches: HashMap<u32, MatchData> = HashMap::new();
        let mut required: Vec<HashSet<u32>> = Vec::new();
        let mut prohibited: HashSet<u32> = HashSet::new();
        let mut has_positive = false;

        for clause in &clauses {
            let mut clause_docs = HashSet::new();

            for (term, by_field) in self.matching_terms(clause) {
                let idf = self.idf(by_field);
                for (field, postings) in by_field {
                    if clause.field.as_ref().is_some_and(|f| f != field) {
                        continue;
                    }
                    for posting in postings {
                        clause_docs.insert(posting.doc);
                        if clause.presence == Presence::Prohibited {
                            continue;
                        }
                        *scores.entry(posting.doc).or_default() +=
                            self.score(field, *posting, idf);
                        matches
                            .entry(posting.doc)
                            .or_default()
                            .metadata
                            .entry(term.clone())
                            .or_default()
                            .insert(field.clone());
                    }
                }
            }

            match clause.presence {
                Presence::Optional => has_positive = true,
                Presence::Required => {
                    has_positive = true;
                    required.push(clause_docs);
                }
                Presence::Prohibited => prohibited.extend(clause_docs),
            }
        }

        if !has_positive {
            return Vec::new();
        }

        // Documents sharing a ref collapse into one hit carrying the best score.
        let mut by_ref: BTreeMap<&str, Hit> = BTreeMap::new();
        for (doc, score) in scores {
            if prohibited.contains(&doc) || !required.iter().all(|set| set.contains(&doc)) {
                continue;
            }
            let doc_ref = self.refs[doc as usize].as_str();
            let match_data = matches.remove(&doc).unwrap_or_default();
            by_ref
                .entry(doc_ref)
                .and_modify(|hit| {
                    hit.score = hit.score.max(score);
                    for (term, fields) in &match_data.metadata {
                        hit.match_data
                            .metadata
                            .entry(term.clone())
                            .or_default()
                            .extend(fields.iter().cloned());
                    }
                })
                .or_insert_with(|| Hit {
                    doc_ref: doc_ref.to_string(),
                    score,
                    match_data: match_data.clone(),
                });
        }

        let mut hits: Vec<Hit> = by_ref.into_values().collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_ref.cmp(&b.doc_ref))
        });
        hits
    }

    /// Index terms a clause refers to: the exact term, or every term sharing its prefix.
    fn matching_terms<'a>(
        &'a self,
        clause: &'a Clause,
    ) -> Box<dyn Iterator<Item = (&'a String, &'a BTreeMap<String, Vec<Posting>>)> + 'a> {
        if clause.prefix {
            Box::new(
                self.postings
                    .range(clause.term.clone()..)
                    .take_while(move |(term, _)| term.starts_with(clause.term.as_str())),
            )
        } else {
            Box::new(self.postings.get_key_value(&clause.term).into_iter())
        }
    }

    /// IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1), df counted across all fields.
    fn idf(&self, by_field: &BTreeMap<String, Vec<Posting>>) -> f32 {
        let docs: HashSet<u32> = by_field
            .values()
            .flat_map(|postings| postings.iter().map(|p| p.doc))
            .collect();
        let df = docs.len() as f32;
        let n = self.refs.len() as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score(&self, field: &str, posting: Posting, idf: f32) -> f32 {
        let boost = self
            .fields
            .iter()
            .find(|f| f.name == field)
            .map_or(1.0, |f| f.boost);
        let avg = self.avg_field_length.get(field).copied().unwrap_or(0.0);
        let len = self.field_lengths[posting.doc as usize]
            .get(field)
            .copied()
            .unwrap_or(0) as f32;
        let tf = posting.tf as f32;
        let norm = if avg > 0.0 { len / avg } else { 1.0 };

        boost * idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * norm))
    }
}
