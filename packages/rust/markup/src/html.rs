//! Conversion between HTML text and the owned [`Node`] tree.
//!
//! Parsing is delegated to `scraper` (html5ever); serialization follows the
//! HTML fragment serialization rules closely enough to round-trip parsed pages.

use scraper::Html;
use tracing::debug;

use crate::tree::{Element, Node};

/// Elements that never have an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Elements whose leading newline is dropped by the parser.
const NEWLINE_ELEMENTS: &[&str] = &["listing", "pre", "textarea"];

/// Parse a full HTML page into a [`Node::Document`].
pub fn parse_document(html: &str) -> Node {
    let parsed = Html::parse_document(html);
    if !parsed.errors.is_empty() {
        debug!(errors = parsed.errors.len(), "html parser recovered from errors");
    }

    let root = parsed.tree.root();
    let mut stack = vec![(root, root.children(), Vec::new())];

    while let Some((_, children, out)) = stack.last_mut() {
        if let Some(child) = children.next() {
            match child.value() {
                scraper::Node::Element(_)
                | scraper::Node::Document
                | scraper::Node::Fragment => {
                    stack.push((child, child.children(), Vec::new()));
                }
                scraper::Node::Text(text) => out.push(Node::Text(String::from(&*text.text))),
                scraper::Node::Comment(comment) => {
                    out.push(Node::Comment(String::from(&*comment.comment)));
                }
                scraper::Node::Doctype(doctype) => out.push(Node::Doctype {
                    name: doctype.name().to_string(),
                    public_id: doctype.public_id().to_string(),
                    system_id: doctype.system_id().to_string(),
                }),
                _ => {}
            }
            continue;
        }

        let Some((node, _, children)) = stack.pop() else { break };
        let built = match node.value() {
            scraper::Node::Element(element) => Node::Element(Element {
                name: element.name().to_string(),
                attrs: element
                    .attrs
                    .iter()
                    .map(|(name, value)| {
                        let name = match &name.prefix {
                            Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
                            None => name.local.to_string(),
                        };
                        (name, value.to_string())
                    })
                    .collect(),
                children,
            }),
            _ => Node::Document { children },
        };

        match stack.last_mut() {
            Some((_, _, out)) => out.push(built),
            None => return built,
        }
    }

    Node::Document {
        children: Vec::new(),
    }
}

/// Serialize a tree back to HTML text.
pub fn to_html(root: &Node) -> String {
    to_html_all(std::slice::from_ref(root))
}

/// Serialize a sequence of sibling nodes back to HTML text.
pub fn to_html_all(nodes: &[Node]) -> String {
    enum Step<'a> {
        Visit(&'a Node, bool),
        Close(&'a str),
    }

    let mut out = String::new();
    let mut stack: Vec<Step<'_>> = nodes.iter().rev().map(|n| Step::Visit(n, false)).collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Step::Visit(node, raw) => match node {
                Node::Document { children } => {
                    stack.extend(children.iter().rev().map(|c| Step::Visit(c, false)));
                }
                Node::Element(element) => {
                    write_start_tag(&mut out, element);
                    if VOID_ELEMENTS.contains(&element.name.as_str()) {
                        continue;
                    }
                    if NEWLINE_ELEMENTS.contains(&element.name.as_str())
                        && matches!(element.children.first(), Some(Node::Text(t)) if t.starts_with('\n'))
                    {
                        out.push('\n');
                    }
                    stack.push(Step::Close(&element.name));
                    let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
                    stack.extend(element.children.iter().rev().map(|c| Step::Visit(c, raw)));
                }
                Node::Text(text) if raw => out.push_str(text),
                Node::Text(text) => escape_into(&mut out, text, false),
                Node::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                Node::Doctype {
                    name,
                    public_id,
                    system_id,
                } => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    if !public_id.is_empty() {
                        out.push_str(&format!(" PUBLIC \"{public_id}\""));
                    }
                    if !system_id.is_empty() {
                        if public_id.is_empty() {
                            out.push_str(" SYSTEM");
                        }
                        out.push_str(&format!(" \"{system_id}\""));
                    }
                    out.push('>');
                }
            },
        }
    }

    out
}

fn write_start_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    out.push('>');
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
