//! Table markup tree
//!
//! Tables arrive as XML fragments from the LaTeX parser. They are read into
//! a small owned tree with quick-xml, normalized into HTML-like structure,
//! and serialized back for display and identity hashing.

use std::fmt;
use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

/// Element renames applied during normalization
const RENAMES: &[(&str, &str)] = &[("row", "tr"), ("cell", "td")];

/// Math subtrees are dropped entirely
const MATH_TAG: &str = "texmath";

pub const TABLE_TAG: &str = "table";

/// Markup that could not be read as a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupError {
    pub position: u64,
    pub message: String,
}

impl MarkupError {
    fn new(position: u64, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed markup at byte {}: {}", self.position, self.message)
    }
}

impl std::error::Error for MarkupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
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

    /// Descendant elements with the given name, depth-first in document order.
    /// Includes `self` when it matches.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_named(self, name, &mut found);
        found
    }
}

fn collect_named<'a>(el: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    if el.name == name {
        found.push(el);
    }
    for child in &el.children {
        if let Node::Element(c) = child {
            collect_named(c, name, found);
        }
    }
}

/// A parsed markup document. Fragments may hold several top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    /// Parse markup into a tree. Mismatched or unclosed tags are errors.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut reader = Reader::from_str(markup);
        let mut stack: Vec<Element> = Vec::new();
        let mut roots: Vec<Node> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => stack.push(element_from(&e, position)?),
                Ok(Event::Empty(e)) => {
                    let el = element_from(&e, position)?;
                    attach(&mut stack, &mut roots, Node::Element(el));
                }
                Ok(Event::End(_)) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| MarkupError::new(position, "unexpected closing tag"))?;
                    attach(&mut stack, &mut roots, Node::Element(el));
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| MarkupError::new(position, err.to_string()))?;
                    if !text.is_empty() {
                        attach(&mut stack, &mut roots, Node::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    attach(&mut stack, &mut roots, Node::Text(text));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(MarkupError::new(
                        reader.error_position(),
                        e.to_string(),
                    ));
                }
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(MarkupError::new(
                reader.buffer_position(),
                format!("unclosed element <{}>", open.name),
            ));
        }
        Ok(Self { nodes: roots })
    }

    /// Structural rewrite: `row`/`cell` become `tr`/`td`, math subtrees go away.
    pub fn normalized(&self) -> Self {
        Self {
            nodes: normalize_nodes(&self.nodes),
        }
    }

    /// Serialize back to markup. Elements are always written with an
    /// explicit closing tag so the result is also valid HTML.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            render_node(node, &mut out);
        }
        out
    }

    /// All text nodes in document order, joined by a single space.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(&self.nodes, &mut parts);
        parts.join(" ")
    }

    /// First element with `name` anywhere in the document.
    pub fn first(&self, name: &str) -> Option<&Element> {
        self.find_all(name).into_iter().next()
    }

    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for node in &self.nodes {
            if let Node::Element(el) = node {
                collect_named(el, name, &mut found);
            }
        }
        found
    }

    /// The fragment as a single element: the first `<table>` if any,
    /// otherwise a synthetic root over all top-level nodes.
    pub fn root_table(&self) -> Element {
        match self.first(TABLE_TAG) {
            Some(table) => table.clone(),
            None => Element {
                name: String::new(),
                attrs: Vec::new(),
                children: self.nodes.clone(),
            },
        }
    }
}

fn element_from(start: &BytesStart<'_>, position: u64) -> Result<Element, MarkupError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MarkupError::new(position, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MarkupError::new(position, e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn normalize_nodes(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Element(el) if el.name == MATH_TAG => None,
            Node::Element(el) => Some(Node::Element(Element {
                name: renamed(&el.name).to_string(),
                attrs: el.attrs.clone(),
                children: normalize_nodes(&el.children),
            })),
            Node::Text(t) => Some(Node::Text(t.clone())),
        })
        .collect()
}

fn renamed(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map_or(name, |&(_, to)| to)
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&escape(t.as_str())),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attrs {
                let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
            }
            out.push('>');
            for child in &el.children {
                render_node(child, out);
            }
            let _ = write!(out, "</{}>", el.name);
        }
    }
}

fn collect_text<'a>(nodes: &'a [Node], parts: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(t) => parts.push(t),
            Node::Element(el) => collect_text(&el.children, parts),
        }
    }
}

/// Whitespace- and attribute-order-insensitive serialization of an element.
///
/// Attributes are sorted by name, whitespace-only text is dropped and
/// remaining runs of whitespace collapse to one space.
pub fn canonical_form(el: &Element) -> String {
    let mut out = String::new();
    write_canonical(el, &mut out);
    out
}

fn write_canonical(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    let mut attrs: Vec<&(String, String)> = el.attrs.iter().collect();
    attrs.sort();
    for (key, value) in attrs {
        let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
    }
    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(c) => write_canonical(c, out),
            Node::Text(t) => {
                let collapsed = t.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    out.push_str(&escape(collapsed.as_str()));
                }
            }
        }
    }
    let _ = write!(out, "</{}>", el.name);
}
