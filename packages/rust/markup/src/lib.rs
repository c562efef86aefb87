//! Markup tree, rewrite pass, and search-marker extraction.
//!
//! - [`tree`]: owned [`Node`] tree and the [`transform`] rewrite pass
//! - [`html`]: HTML text to tree and back
//! - [`extract`]: finds document markers, turns them into documents, strips them

pub mod extract;
pub mod html;
pub mod tree;

pub use extract::{Extraction, MarkerTags, PageExtraction, extract_documents, extract_page};
pub use html::{parse_document, to_html, to_html_all};
pub use tree::{Element, Node, transform};
