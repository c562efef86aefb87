//! Document marker extraction.
//!
//! A page declares searchable documents with three custom elements:
//!
//! ```html
//! <search-document index="blog">
//!   <search-field name="title" value="Hello"></search-field>
//!   <search-text name="content">World</search-text>
//! </search-document>
//! ```
//!
//! Every document marker becomes one [`ExtractedDocument`] and is removed from
//! the page; everything else is left in place.

use std::collections::BTreeMap;

use tracing::{debug, instrument, warn};

use siteindex_shared::{CANONICAL_URL_FIELD, ExtractedDocument, ID_FIELD, IndexKey};

use crate::html;
use crate::tree::{self, Element, Node};

/// Tag names of the three marker kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTags {
    pub document: String,
    pub field: String,
    pub text: String,
}

impl MarkerTags {
    /// `<prefix>-document`, `<prefix>-field`, `<prefix>-text`.
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim().to_ascii_lowercase();
        Self {
            document: format!("{prefix}-document"),
            field: format!("{prefix}-field"),
            text: format!("{prefix}-text"),
        }
    }
}

impl Default for MarkerTags {
    fn default() -> Self {
        Self::with_prefix("search")
    }
}

/// Rewritten tree plus the documents removed from it, in encounter order.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub tree: Vec<Node>,
    pub documents: Vec<ExtractedDocument>,
}

/// Rewritten HTML plus the documents removed from it, in encounter order.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub html: String,
    pub documents: Vec<ExtractedDocument>,
}

/// Remove every document marker from `root`, collecting one document per marker.
///
/// Markers nested inside another document marker are extracted as documents of
/// their own (outer before inner); their fields never leak into the outer one.
pub fn extract_documents(root: &Node, canonical_url: &str, tags: &MarkerTags) -> Extraction {
    let mut documents = Vec::new();

    let tree = tree::transform(root, |node, _, _| {
        if !node.is_element(&tags.document) {
            return None;
        }
        for marker in document_markers(node, tags) {
            documents.push(parse_document_marker(marker, canonical_url, tags));
        }
        Some(Vec::new())
    });

    Extraction { tree, documents }
}

/// Parse `html`, extract its documents, and serialize the rewritten page.
///
/// When the page carries no markers the returned HTML is the input, unchanged.
#[instrument(skip(html, tags), fields(len = html.len()))]
pub fn extract_page(html: &str, canonical_url: &str, tags: &MarkerTags) -> PageExtraction {
    let root = html::parse_document(html);
    let Extraction { tree, documents } = extract_documents(&root, canonical_url, tags);

    if documents.is_empty() {
        return PageExtraction {
            html: html.to_string(),
            documents,
        };
    }

    debug!(documents = documents.len(), "extracted search documents");
    PageExtraction {
        html: html::to_html_all(&tree),
        documents,
    }
}

/// All document markers in the subtree of `root` (itself included), pre-order.
fn document_markers<'a>(root: &'a Node, tags: &MarkerTags) -> Vec<&'a Element> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(element) = node.as_element().filter(|el| el.name == tags.document) {
            found.push(element);
        }
        stack.extend(node.children().iter().rev());
    }

    found
}

/// Build one document from a marker's own field and text markers.
fn parse_document_marker(
    marker: &Element,
    canonical_url: &str,
    tags: &MarkerTags,
) -> ExtractedDocument {
    let mut fields = BTreeMap::new();
    let mut stack: Vec<&Node> = marker.children.iter().rev().collect();

    while let Some(node) = stack.pop() {
        let Some(element) = node.as_element() else {
            continue;
        };

        if element.name == tags.document {
            // Nested document: extracted on its own.
            continue;
        }

        if element.name == tags.field {
            match element.attr("name") {
                Some(name) => {
                    let value = element.attr("value").unwrap_or_default();
                    fields.insert(name.to_string(), value.to_string());
                }
                None => warn!(canonical_url, tag = %element.name, "field marker without a name"),
            }
        } else if element.name == tags.text {
            match element.attr("name") {
                Some(name) => {
                    fields.insert(name.to_string(), direct_text(element));
                }
                None => warn!(canonical_url, tag = %element.name, "text marker without a name"),
            }
        }

        stack.extend(element.children.iter().rev());
    }

    let id = fields.remove(ID_FIELD);
    fields.remove(CANONICAL_URL_FIELD);

    ExtractedDocument {
        canonical_url: canonical_url.to_string(),
        index: IndexKey::from(marker.attr("index")),
        id,
        fields,
    }
}

/// Direct text children of `element`, joined with newlines.
fn direct_text(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|child| match child {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_document, to_html_all};

    fn page(body: &str) -> String {
        format!("<!DOCTYPE html><html><head><title>Page</title></head><body>{body}</body></html>")
    }

    fn extract(body: &str) -> PageExtraction {
        extract_page(&page(body), "blog/hello", &MarkerTags::default())
    }

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    #[test]
    fn field_and_text_markers_become_one_document() {
        let result = extract(
            r#"<search-document><search-field name="title" value="Hello"></search-field><search-text name="content">World</search-text></search-document>"#,
        );

        assert_eq!(result.documents.len(), 1);
        let doc = &result.documents[0];
        assert_eq!(doc.canonical_url, "blog/hello");
        assert!(doc.index.is_default());
        assert_eq!(doc.id, None);
        assert_eq!(doc.fields["title"], "Hello");
        assert_eq!(doc.fields["content"], "World");

        assert_eq!(result.html, page(""));
    }

    #[test]
    fn surrounding_content_is_kept_in_order() {
        let result = extract(
            r#"<p>Before</p><search-document><search-field name="t" value="x"></search-field></search-document><p>Middle</p><search-document index="blog"></search-document><p>After</p>"#,
        );

        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.html, page("<p>Before</p><p>Middle</p><p>After</p>"));
        assert!(!result.html.contains("search-"));
    }

    #[test]
    fn documents_keep_encounter_order_and_index() {
        let result = extract(
            r#"<div><search-document index="docs"><search-field name="n" value="1"></search-field></search-document></div><search-document index="blog"><search-field name="n" value="2"></search-field></search-document>"#,
        );

        let order: Vec<(&str, &str)> = result
            .documents
            .iter()
            .map(|d| (d.index.as_str(), d.fields["n"].as_str()))
            .collect();
        assert_eq!(order, vec![("docs", "1"), ("blog", "2")]);
    }

    #[test]
    fn text_marker_joins_direct_text_children() {
        let root = Node::Document {
            children: vec![
                Element::new("search-document")
                    .with_child(
                        Element::new("search-text")
                            .with_attr("name", "content")
                            .with_child(Node::text("line one"))
                            .with_child(Element::new("em").with_child(Node::text("skipped")))
                            .with_child(Node::text("line two")),
                    )
                    .into(),
            ],
        };

        let result = extract_documents(&root, "p", &MarkerTags::default());
        assert_eq!(result.documents[0].fields["content"], "line one\nline two");
        assert_eq!(result.tree, vec![Node::Document { children: vec![] }]);
    }

    #[test]
    fn duplicate_field_names_keep_the_last_value() {
        let result = extract(
            r#"<search-document><search-field name="title" value="first"></search-field><div><search-field name="title" value="second"></search-field></div></search-document>"#,
        );
        assert_eq!(result.documents[0].fields["title"], "second");
    }

    #[test]
    fn nested_markers_extract_independently() {
        let result = extract(
            r#"<search-document index="outer"><search-field name="title" value="Outer"></search-field><search-document index="inner"><search-field name="title" value="Inner"></search-field><search-field name="only_inner" value="y"></search-field></search-document><search-field name="tail" value="z"></search-field></search-document>"#,
        );

        assert_eq!(result.documents.len(), 2);
        let outer = &result.documents[0];
        let inner = &result.documents[1];
        assert_eq!(outer.index.as_str(), "outer");
        assert_eq!(outer.fields["title"], "Outer");
        assert_eq!(outer.fields["tail"], "z");
        assert!(!outer.fields.contains_key("only_inner"));
        assert_eq!(inner.index.as_str(), "inner");
        assert_eq!(inner.fields["title"], "Inner");
        assert_eq!(result.html, page(""));
    }

    #[test]
    fn reserved_fields_are_lifted_out() {
        let result = extract(
            r#"<search-document><search-field name="id" value="custom-id"></search-field><search-field name="canonicalUrl" value="spoofed"></search-field></search-document>"#,
        );
        let doc = &result.documents[0];
        assert_eq!(doc.id.as_deref(), Some("custom-id"));
        assert_eq!(doc.canonical_url, "blog/hello");
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn unnamed_fields_are_skipped_and_missing_values_are_empty() {
        let result = extract(
            r#"<search-document><search-field value="orphan"></search-field><search-field name="tag"></search-field></search-document>"#,
        );
        let fields = &result.documents[0].fields;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["tag"], "");
    }

    #[test]
    fn page_without_markers_is_returned_verbatim() {
        let html = "<html>\n  <body><p>Unparsed   spacing</p></body>\n</html>";
        let result = extract_page(html, "plain", &MarkerTags::default());
        assert!(result.documents.is_empty());
        assert_eq!(result.html, html);
    }

    #[test]
    fn custom_prefix_selects_other_tags() {
        let tags = MarkerTags::with_prefix("lunr");
        let html = page(
            r#"<lunr-document index="x"><lunr-field name="a" value="b"></lunr-field></lunr-document><search-document></search-document>"#,
        );
        let result = extract_page(&html, "p", &tags);
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].index.as_str(), "x");
        assert_eq!(result.html, page("<search-document></search-document>"));
    }

    #[test]
    fn extraction_is_stable_across_runs() {
        let html = page(
            r#"<search-document><search-field name="title" value="Hello"></search-field></search-document><p>Keep</p>"#,
        );
        let first = extract_page(&html, "a", &MarkerTags::default());
        let second = extract_page(&html, "a", &MarkerTags::default());
        assert_eq!(first.html, second.html);
        assert_eq!(first.documents, second.documents);

        let reparsed = to_html_all(&[parse_document(&first.html)]);
        assert_eq!(reparsed, first.html);
    }

    #[test]
    fn fixture_blog_post() {
        let html = load_fixture("blog-post.html");
        let result = extract_page(&html, "blog/static-search", &MarkerTags::default());

        assert_eq!(result.documents.len(), 1);
        let doc = &result.documents[0];
        assert_eq!(doc.index, IndexKey::named("blog"));
        assert_eq!(doc.canonical_url, "blog/static-search");
        assert_eq!(doc.fields["date"], "2024-05-01");
        assert_eq!(
            doc.fields["content"],
            "Search without a server: build once, fetch lazily."
        );

        assert!(!result.html.contains("search-document"));
        assert!(!result.html.contains("search-field"));
        assert!(result.html.contains("<h1>Shipping a static search index</h1>"));
        assert!(result.html.contains(r#"<link rel="stylesheet" href="/assets/site.css">"#));
        assert!(result.html.contains("&amp; Co."));
    }

    #[test]
    fn fixture_docs_page_with_nested_marker() {
        let html = load_fixture("docs-page.html");
        let result = extract_page(&html, "docs/configuration", &MarkerTags::default());

        assert_eq!(result.documents.len(), 2);
        let outer = &result.documents[0];
        assert_eq!(outer.id.as_deref(), Some("docs-configuration"));
        assert!(outer.index.is_default());
        assert_eq!(outer.fields["title"], "Configuration");
        assert!(!outer.fields.contains_key("id"));

        let inner = &result.documents[1];
        assert_eq!(inner.index, IndexKey::named("glossary"));
        assert_eq!(inner.fields["title"], "sub_dir");
        assert!(inner.id.is_none());

        assert!(result.html.contains("<code>siteindex.toml</code>"));
        assert!(!result.html.contains("Directory receiving the artifacts."));
    }

    #[test]
    fn fixture_plain_page_is_untouched() {
        let html = load_fixture("plain-page.html");
        let result = extract_page(&html, "about", &MarkerTags::default());
        assert!(result.documents.is_empty());
        assert_eq!(result.html, html);
    }

    #[test]
    fn fixture_icon_page_keeps_svg_and_pre_content() {
        let html = load_fixture("icon-page.html");
        let result = extract_page(&html, "icons", &MarkerTags::default());

        assert_eq!(result.documents.len(), 1);
        assert!(!result.html.contains("search-document"));
        assert!(result.html.contains(r##"<use xlink:href="#icon"></use>"##));
        assert!(result.html.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        assert!(result.html.contains("<pre>\n\n  two leading newlines</pre>"));

        let again = extract_page(&result.html, "icons", &MarkerTags::default());
        assert_eq!(again.html, result.html);
    }
}
