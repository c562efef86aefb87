//! Text tokenization shared by indexing and querying.

use regex::Regex;

use siteindex_shared::{Result, SiteIndexError};

/// Default token separator: whitespace and hyphens.
pub const DEFAULT_SEPARATOR: &str = r"[\s\-]+";

/// Splits text into lowercase terms.
///
/// - Split on the separator pattern
/// - Trim non-alphanumeric characters from both ends of each piece
/// - Lowercase, drop empty terms
#[derive(Debug, Clone)]
pub struct Tokenizer {
    separator: Regex,
}

impl Tokenizer {
    /// Build a tokenizer splitting on `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let separator = Regex::new(pattern).map_err(|e| {
            SiteIndexError::config(format!("invalid token separator {pattern:?}: {e}"))
        })?;
        Ok(Self { separator })
    }

    /// The separator pattern this tokenizer was built from.
    pub fn pattern(&self) -> &str {
        self.separator.as_str()
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.separator
            .split(text)
            .map(|piece| piece.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|piece| !piece.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            separator: Regex::new(DEFAULT_SEPARATOR).expect("valid regex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_basic() {
        let tokens = Tokenizer::default().tokenize("Hello, World!");
        assert_eq!(tokens, vec!["hello", "world"]);
    }

    #[test]
    fn tokenize_splits_hyphens() {
        let tokens = Tokenizer::default().tokenize("static-site search");
        assert_eq!(tokens, vec!["static", "site", "search"]);
    }

    #[test]
    fn tokenize_keeps_inner_punctuation() {
        let tokens = Tokenizer::default().tokenize("v1.2 (don't)");
        assert_eq!(tokens, vec!["v1.2", "don't"]);
    }

    #[test]
    fn tokenize_empty_and_punctuation() {
        assert!(Tokenizer::default().tokenize("").is_empty());
        assert!(Tokenizer::default().tokenize("... --- ...").is_empty());
    }

    #[test]
    fn custom_separator() {
        let tokenizer = Tokenizer::new(r"[\s/]+").unwrap();
        assert_eq!(tokenizer.tokenize("a/b-c d"), vec!["a", "b-c", "d"]);
        assert_eq!(tokenizer.pattern(), r"[\s/]+");
    }

    #[test]
    fn invalid_separator_is_config_error() {
        let err = Tokenizer::new("[unclosed").unwrap_err();
        assert!(err.to_string().starts_with("config error"));
    }
}
