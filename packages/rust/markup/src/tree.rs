//! Owned markup tree and the generic rewrite pass over it.

/// One node of a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Root of a parsed page.
    Document { children: Vec<Node> },
    Element(Element),
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// An element with its attributes in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: append an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Builder: append a child node.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    /// Child nodes; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children } => children,
            Node::Element(element) => &element.children,
            _ => &[],
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// True for an element named `name`.
    pub fn is_element(&self, name: &str) -> bool {
        self.as_element().is_some_and(|el| el.name == name)
    }

    /// Copy of this node with `children` in place of its own.
    fn rebuilt(&self, children: Vec<Node>) -> Node {
        match self {
            Node::Document { .. } => Node::Document { children },
            Node::Element(element) => Node::Element(Element {
                name: element.name.clone(),
                attrs: element.attrs.clone(),
                children,
            }),
            leaf => leaf.clone(),
        }
    }
}

/// Rewrite a tree, letting `replace` substitute any node with zero or more nodes.
///
/// `replace(node, index_in_parent, parent)` is asked first for every visited node.
/// `Some(list)` is spliced in verbatim and the original node's children are not
/// visited. `None` keeps the node and rebuilds its children the same way.
/// The root is visited with no index and no parent.
///
/// The walk uses an explicit stack, so deep pages cannot overflow the call stack.
pub fn transform<F>(root: &Node, mut replace: F) -> Vec<Node>
where
    F: FnMut(&Node, Option<usize>, Option<&Node>) -> Option<Vec<Node>>,
{
    if let Some(replacement) = replace(root, None, None) {
        return replacement;
    }

    struct Frame<'a> {
        node: &'a Node,
        next: usize,
        out: Vec<Node>,
    }

    let mut stack = vec![Frame {
        node: root,
        next: 0,
        out: Vec::with_capacity(root.children().len()),
    }];

    while let Some(frame) = stack.last_mut() {
        let parent = frame.node;
        let children = parent.children();

        if frame.next < children.len() {
            let index = frame.next;
            frame.next += 1;
            let child = &children[index];

            match replace(child, Some(index), Some(parent)) {
                Some(replacement) => frame.out.extend(replacement),
                None if child.children().is_empty() => frame.out.push(child.clone()),
                None => stack.push(Frame {
                    node: child,
                    next: 0,
                    out: Vec::with_capacity(child.children().len()),
                }),
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let rebuilt = done.node.rebuilt(done.out);
        match stack.last_mut() {
            Some(parent_frame) => parent_frame.out.push(rebuilt),
            None => return vec![rebuilt],
        }
    }

    Vec::new()
}
