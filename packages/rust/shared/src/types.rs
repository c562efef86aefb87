//! Core domain types: partitions, extracted documents, persisted records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File name of the serialized search index inside a partition directory.
pub const INDEX_FILE: &str = "idx.json";

/// File name of the document list inside a partition directory.
pub const DOCS_FILE: &str = "docs.json";

/// Field name that carries an explicit document identifier.
pub const ID_FIELD: &str = "id";

/// Field name that carries the source page identity.
pub const CANONICAL_URL_FIELD: &str = "canonicalUrl";

// ---------------------------------------------------------------------------
// IndexKey
// ---------------------------------------------------------------------------

/// Name of the partition a document belongs to. `None` is the unnamed default.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexKey(Option<String>);

impl IndexKey {
    /// The unnamed default partition.
    pub fn default_partition() -> Self {
        Self(None)
    }

    /// Build a key from a declared name. Blank names select the default partition.
    pub fn named(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if name.is_empty() {
            Self(None)
        } else {
            Self(Some(name.to_string()))
        }
    }

    /// The partition name, `None` for the default partition.
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// The partition name, empty for the default partition.
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }
}

impl From<&str> for IndexKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<Option<&str>> for IndexKey {
    fn from(name: Option<&str>) -> Self {
        name.map(Self::named).unwrap_or_default()
    }
}

impl std::fmt::Display for IndexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("<default>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Derive a document identifier from its canonical URL (hex SHA-256).
pub fn document_id(canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A document as found in page markup, before partitioning.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Identity of the page the marker was found on.
    pub canonical_url: String,
    /// Partition selected by the marker's `index` attribute.
    pub index: IndexKey,
    /// Explicit identifier, when the marker declared an `id` field.
    pub id: Option<String>,
    /// Caller-defined fields (title, content, ...).
    pub fields: BTreeMap<String, String>,
}

impl ExtractedDocument {
    /// Split into the partition key and the persisted record, assigning an id.
    ///
    /// Records without an explicit id get [`document_id`] of their canonical URL,
    /// so several anonymous documents on the same page share one id.
    pub fn into_record(self) -> (IndexKey, DocumentRecord) {
        let id = self
            .id
            .unwrap_or_else(|| document_id(&self.canonical_url));
        (
            self.index,
            DocumentRecord {
                id,
                canonical_url: self.canonical_url,
                fields: self.fields,
            },
        )
    }
}

/// A document as written to `docs.json` and fed to the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(rename = "canonicalUrl")]
    pub canonical_url: String,
    /// Open, caller-defined fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// Look up a field by name, including the required `id` and `canonicalUrl`.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            ID_FIELD => Some(&self.id),
            CANONICAL_URL_FIELD => Some(&self.canonical_url),
            _ => self.fields.get(name).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(url: &str, id: Option<&str>) -> ExtractedDocument {
        ExtractedDocument {
            canonical_url: url.into(),
            index: IndexKey::default(),
            id: id.map(String::from),
            fields: BTreeMap::from([("title".to_string(), "Hello".to_string())]),
        }
    }

    #[test]
    fn blank_index_names_select_default_partition() {
        assert!(IndexKey::named("").is_default());
        assert!(IndexKey::named("  ").is_default());
        assert_eq!(IndexKey::named(" blog ").name(), Some("blog"));
        assert_eq!(IndexKey::from(None).as_str(), "");
    }

    #[test]
    fn document_id_is_stable_per_url() {
        let a = document_id("blog/post-1");
        assert_eq!(a, document_id("blog/post-1"));
        assert_ne!(a, document_id("blog/post-2"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn into_record_keeps_explicit_id() {
        let (_, record) = extracted("page", Some("custom")).into_record();
        assert_eq!(record.id, "custom");

        let (_, record) = extracted("page", None).into_record();
        assert_eq!(record.id, document_id("page"));
    }

    #[test]
    fn record_serializes_flat() {
        let (_, record) = extracted("about", Some("x")).into_record();
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["id"], "x");
        assert_eq!(json["canonicalUrl"], "about");
        assert_eq!(json["title"], "Hello");

        let parsed: DocumentRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, record);
        assert_eq!(parsed.get("title"), Some("Hello"));
        assert_eq!(parsed.get("canonicalUrl"), Some("about"));
    }
}
