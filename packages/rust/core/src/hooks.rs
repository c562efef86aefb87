//! Build customization hooks.
//!
//! Each hook is optional. Hooks are either set programmatically or derived
//! from the `[pages]`, `[documents]`, `[index]` and `[output]` config
//! sections via [`BuildHooks::from_config`].

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use siteindex_search::IndexBuilder;
use siteindex_shared::{
    AppConfig, CANONICAL_URL_FIELD, DocumentRecord, ExtractedDocument, ID_FIELD, IndexKey, Result,
    SiteIndexError,
};

/// Decides whether a page (by pathname) is scanned for markers.
pub type PageFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides whether an extracted document is kept.
pub type DocumentFilter = Arc<dyn Fn(&ExtractedDocument) -> bool + Send + Sync>;

/// Configures a fresh index builder, once per partition.
pub type IndexInitializer = Arc<dyn Fn(&mut IndexBuilder) -> Result<()> + Send + Sync>;

/// Rewrites a record before it is written to `docs.json`.
pub type DocumentMapper = Arc<dyn Fn(DocumentRecord) -> DocumentRecord + Send + Sync>;

/// The set of hooks consulted during a build.
#[derive(Clone, Default)]
pub struct BuildHooks {
    pub page_filter: Option<PageFilter>,
    pub document_filter: Option<DocumentFilter>,
    pub initialize: Option<IndexInitializer>,
    pub map_document: Option<DocumentMapper>,
}

impl fmt::Debug for BuildHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildHooks")
            .field("page_filter", &self.page_filter.is_some())
            .field("document_filter", &self.document_filter.is_some())
            .field("initialize", &self.initialize.is_some())
            .field("map_document", &self.map_document.is_some())
            .finish()
    }
}

impl BuildHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_filter(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.page_filter = Some(Arc::new(f));
        self
    }

    pub fn with_document_filter(
        mut self,
        f: impl Fn(&ExtractedDocument) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.document_filter = Some(Arc::new(f));
        self
    }

    pub fn with_initialize(
        mut self,
        f: impl Fn(&mut IndexBuilder) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.initialize = Some(Arc::new(f));
        self
    }

    pub fn with_map_document(
        mut self,
        f: impl Fn(DocumentRecord) -> DocumentRecord + Send + Sync + 'static,
    ) -> Self {
        self.map_document = Some(Arc::new(f));
        self
    }

    pub fn accepts_page(&self, pathname: &str) -> bool {
        self.page_filter.as_ref().is_none_or(|f| f(pathname))
    }

    pub fn accepts_document(&self, doc: &ExtractedDocument) -> bool {
        self.document_filter.as_ref().is_none_or(|f| f(doc))
    }

    pub fn initialize(&self, builder: &mut IndexBuilder) -> Result<()> {
        match &self.initialize {
            Some(f) => f(builder),
            None => Ok(()),
        }
    }

    pub fn map_document(&self, record: DocumentRecord) -> DocumentRecord {
        match &self.map_document {
            Some(f) => f(record),
            None => record,
        }
    }

    /// Derive hooks from the declarative config sections.
    ///
    /// Fails when a page pattern or the token separator is not a valid regex.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut hooks = Self::new();

        let include = compile_patterns(&config.pages.include)?;
        let exclude = compile_patterns(&config.pages.exclude)?;
        if !include.is_empty() || !exclude.is_empty() {
            hooks = hooks.with_page_filter(move |pathname| {
                (include.is_empty() || include.iter().any(|re| re.is_match(pathname)))
                    && !exclude.iter().any(|re| re.is_match(pathname))
            });
        }

        let excluded: Vec<IndexKey> = config
            .documents
            .exclude_indexes
            .iter()
            .map(IndexKey::named)
            .collect();
        let required = config.documents.require_fields.clone();
        if !excluded.is_empty() || !required.is_empty() {
            hooks = hooks.with_document_filter(move |doc| {
                !excluded.contains(&doc.index)
                    && required.iter().all(|field| has_field(doc, field))
            });
        }

        // Validate eagerly so a bad separator fails before any page is touched.
        siteindex_search::Tokenizer::new(&config.index.separator)?;
        let separator = config.index.separator.clone();
        let fields = config.index.fields.clone();
        hooks = hooks.with_initialize(move |builder| {
            builder.separator(&separator)?;
            for field in &fields {
                builder.field_with_boost(field.name.clone(), field.boost);
            }
            Ok(())
        });

        let strip = config.output.strip_fields.clone();
        if !strip.is_empty() {
            hooks = hooks.with_map_document(move |mut record| {
                for field in &strip {
                    record.fields.remove(field);
                }
                record
            });
        }

        Ok(hooks)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| SiteIndexError::config(format!("invalid page pattern {p:?}: {e}")))
        })
        .collect()
}

fn has_field(doc: &ExtractedDocument, field: &str) -> bool {
    match field {
        ID_FIELD => doc.id.is_some(),
        CANONICAL_URL_FIELD => true,
        _ => doc.fields.contains_key(field),
    }
}
