//! Shared types, error model, and configuration for siteindex.
//!
//! This crate is the foundation depended on by all other siteindex crates.
//! It provides:
//! - [`SiteIndexError`]: the unified error type
//! - Domain types ([`IndexKey`], [`ExtractedDocument`], [`DocumentRecord`])
//! - Configuration ([`AppConfig`], [`BuildSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildSection, BuildSettings, CONFIG_FILE_NAME, DevConfig, DocumentsConfig,
    FieldConfig, IndexConfig, MarkersConfig, OutputConfig, PagesConfig, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, SiteIndexError};
pub use types::{
    CANONICAL_URL_FIELD, DOCS_FILE, DocumentRecord, ExtractedDocument, ID_FIELD, INDEX_FILE,
    IndexKey, document_id,
};
