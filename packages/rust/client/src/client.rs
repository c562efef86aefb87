//! Lazily loading search client.
//!
//! Each index key has its own cache slot. The first caller for a key fetches
//! and parses the artifact; concurrent callers wait for that load instead of
//! issuing their own. A failed load leaves the slot empty so the next call
//! retries.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

use siteindex_search::{Hit, SearchIndex};
use siteindex_shared::{DOCS_FILE, DocumentRecord, INDEX_FILE, IndexKey, Result, SiteIndexError};

use crate::source::{ArtifactSource, join_path};

/// Records of one partition keyed by id.
pub type DocumentMap = HashMap<String, DocumentRecord>;

type Slots<T> = Mutex<HashMap<IndexKey, Arc<OnceCell<Arc<T>>>>>;

/// A search hit paired with the record it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedHit {
    /// `None` when the hit's ref has no record in `docs.json`.
    #[serde(rename = "doc")]
    pub document: Option<DocumentRecord>,
    pub hit: Hit,
}

/// Runtime access to the artifacts of one build.
pub struct SearchClient<S> {
    source: S,
    artifact_dir: String,
    indexes: Slots<SearchIndex>,
    docs: Slots<DocumentMap>,
}

impl<S: ArtifactSource> SearchClient<S> {
    /// `artifact_dir` is the artifact root relative to the source
    /// (the build's `sub_dir`, or `""`).
    pub fn new(source: S, artifact_dir: impl Into<String>) -> Self {
        Self {
            source,
            artifact_dir: artifact_dir.into(),
            indexes: Mutex::new(HashMap::new()),
            docs: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The search index of `key`, fetched on first use.
    pub async fn get_index(&self, key: &IndexKey) -> Result<Arc<SearchIndex>> {
        let slot = slot(&self.indexes, key).await;
        let index = slot
            .get_or_try_init(|| async move {
                let bytes = self.fetch_artifact(key, INDEX_FILE).await?;
                let index = SearchIndex::load_slice(&bytes)?;
                debug!(index = %key, documents = index.len(), "search index loaded");
                Ok::<_, SiteIndexError>(Arc::new(index))
            })
            .await?;
        Ok(Arc::clone(index))
    }

    /// The records of `key` by id, fetched on first use.
    ///
    /// When several records share an id the later one wins.
    pub async fn get_docs(&self, key: &IndexKey) -> Result<Arc<DocumentMap>> {
        let slot = slot(&self.docs, key).await;
        let docs = slot
            .get_or_try_init(|| async move {
                let bytes = self.fetch_artifact(key, DOCS_FILE).await?;
                let records: Vec<DocumentRecord> = serde_json::from_slice(&bytes).map_err(|e| {
                    SiteIndexError::parse(format!("invalid {DOCS_FILE} for index={key}: {e}"))
                })?;
                let map: DocumentMap = records.into_iter().map(|r| (r.id.clone(), r)).collect();
                debug!(index = %key, documents = map.len(), "documents loaded");
                Ok::<_, SiteIndexError>(Arc::new(map))
            })
            .await?;
        Ok(Arc::clone(docs))
    }

    /// Search the index of `key`.
    ///
    /// An empty or whitespace-only query returns no hits without fetching
    /// anything; the index would not match it either, since it has no terms.
    #[instrument(skip(self), fields(index = %key))]
    pub async fn search(&self, query: &str, key: &IndexKey) -> Result<Vec<Hit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let index = self.get_index(key).await?;
        Ok(index.search(query))
    }

    /// Pair each hit with its record, in hit order.
    pub async fn enrich(&self, hits: Vec<Hit>, key: &IndexKey) -> Result<Vec<EnrichedHit>> {
        let docs = self.get_docs(key).await?;
        Ok(hits
            .into_iter()
            .map(|hit| EnrichedHit {
                document: docs.get(&hit.doc_ref).cloned(),
                hit,
            })
            .collect())
    }

    /// [`search`](Self::search) then [`enrich`](Self::enrich).
    ///
    /// Documents are only fetched when there is at least one hit.
    pub async fn search_enriched(&self, query: &str, key: &IndexKey) -> Result<Vec<EnrichedHit>> {
        let hits = self.search(query, key).await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        self.enrich(hits, key).await
    }

    async fn fetch_artifact(&self, key: &IndexKey, file: &str) -> Result<Vec<u8>> {
        let path = join_path(&[&self.artifact_dir, key.as_str(), file]);
        debug!(%path, "fetching artifact");
        self.source
            .fetch(&path)
            .await?
            .ok_or_else(|| SiteIndexError::missing_artifact(key.as_str(), file))
    }
}

async fn slot<T>(slots: &Slots<T>, key: &IndexKey) -> Arc<OnceCell<Arc<T>>> {
    Arc::clone(slots.lock().await.entry(key.clone()).or_default())
}
