//! Query string parsing.
//!
//! Whitespace separates clauses. Each clause may carry:
//! - a leading `+` (required) or `-` (prohibited)
//! - a `field:` scope
//! - a trailing `*` (prefix match)

use crate::tokenizer::Tokenizer;

/// Whether a clause must, may, or must not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    Prohibited,
}

/// One term of a parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub term: String,
    pub field: Option<String>,
    pub prefix: bool,
    pub presence: Presence,
}

/// Parse `query` into clauses, normalizing terms with `tokenizer`.
pub fn parse_query(query: &str, tokenizer: &Tokenizer) -> Vec<Clause> {
    let mut clauses = Vec::new();

    for raw in query.split_whitespace() {
        let (presence, rest) = match raw.as_bytes().first() {
            Some(b'+') => (Presence::Required, &raw[1..]),
            Some(b'-') => (Presence::Prohibited, &raw[1..]),
            _ => (Presence::Optional, raw),
        };

        let (field, rest) = match rest.split_once(':') {
            Some((field, term)) if !field.is_empty() && !term.is_empty() => {
                (Some(field.to_string()), term)
            }
            _ => (None, rest),
        };

        let (prefix, rest) = match rest.strip_suffix('*') {
            Some(stem) => (true, stem),
            None => (false, rest),
        };

        let terms = tokenizer.tokenize(rest);
        let last = terms.len().saturating_sub(1);
        for (i, term) in terms.into_iter().enumerate() {
            clauses.push(Clause {
                term,
                field: field.clone(),
                prefix: prefix && i == last,
                presence,
            });
        }
    }

    clauses
}
