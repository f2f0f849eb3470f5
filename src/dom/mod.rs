//! Owned, mutable document model.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Detaching a node removes it from its parent's child list but
//! keeps the arena slot, so ids handed out earlier stay valid. A node is
//! *connected* when walking its parents reaches the document node.

mod parse;

use crate::style::css::DeclarationBlock;
use crate::style::selector::SelectorList;
use crate::{Error, Result};

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element namespace. Everything at or below an `<svg>` element is `Svg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub namespace: Namespace,
    attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str, namespace: Namespace) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            namespace,
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn is_svg(&self) -> bool {
        self.namespace == Namespace::Svg
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A parsed (or hand-built) HTML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// Parse an HTML document. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        parse::parse_document(html)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The `<html>` element, if present
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    pub fn head(&self) -> Option<NodeId> {
        self.top_level_child("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.top_level_child("body")
    }

    fn top_level_child(&self, name: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|&c| self.element(c).map(|e| e.name == name).unwrap_or(false))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached HTML element (`svg` starts the SVG namespace)
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let ns = if name.eq_ignore_ascii_case("svg") {
            Namespace::Svg
        } else {
            Namespace::Html
        };
        self.create_element_ns(name, ns)
    }

    pub fn create_element_ns(&mut self, name: &str, namespace: Namespace) -> NodeId {
        self.push(NodeData::Element(ElementData::new(name, namespace)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("unknown node {}", id.0)))
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// `None` for ids this document never handed out
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    /// Number of nodes in the arena, connected or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node created at or after `mark` (a previous
    /// [`node_count`](Self::node_count)). Those nodes are detached first, so
    /// the remaining tree never points into the discarded range; ids from
    /// that range become unknown.
    pub fn discard_from(&mut self, mark: usize) {
        if mark >= self.nodes.len() {
            return;
        }
        for index in mark..self.nodes.len() {
            if matches!(self.nodes[index].parent, Some(p) if p.0 < mark) {
                self.detach(NodeId(index));
            }
        }
        self.nodes.truncate(mark);
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element parent, skipping the document node
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.element(p).is_some())
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.parent(node);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root() || (self.contains_node(id) && self.is_ancestor_of(self.root(), id))
    }

    /// Append `child` to `parent`, detaching it from any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(parent)?;
        self.check(child)?;
        if parent == child || self.is_ancestor_of(child, parent) {
            return Err(Error::InvalidInput(
                "cannot append a node to its own subtree".into(),
            ));
        }
        if matches!(self.data(parent), Some(NodeData::Text(_) | NodeData::Comment(_))) {
            return Err(Error::InvalidInput("character data cannot have children".into()));
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::InvalidInput(format!(
                "node {} is not a child of node {}",
                child.0, parent.0
            )));
        }
        self.detach(child);
        Ok(())
    }

    /// Remove the node from its parent, if any. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|&c| c != id);
            self.nodes[id.0].parent = None;
        }
    }

    /// Copy a node (and with `deep`, its whole subtree) into a new detached node
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId> {
        self.check(id)?;
        let data = self.nodes[id.0].data.clone();
        let copy = self.push(data);
        if deep {
            let children = self.nodes[id.0].children.clone();
            for child in children {
                let child_copy = self.clone_node(child, true)?;
                self.nodes[child_copy.0].parent = Some(copy);
                self.nodes[copy.0].children.push(child_copy);
            }
        }
        Ok(copy)
    }

    /// The node and all of its descendants in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            for &c in self.children(n).iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// Element nodes of the subtree in document order
    pub fn element_descendants(&self, id: NodeId, include_self: bool) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| (include_self || n != id) && self.element(n).is_some())
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// The element's inline `style` attribute as a declaration block
    pub fn inline_style(&self, id: NodeId) -> DeclarationBlock {
        self.element(id)
            .and_then(|e| e.attr("style"))
            .map(DeclarationBlock::parse)
            .unwrap_or_default()
    }

    /// Replace the element's whole inline style
    pub fn set_style_text(&mut self, id: NodeId, css_text: &str) -> Result<()> {
        let el = self
            .element_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("node {} is not an element", id.0)))?;
        el.set_attr("style", css_text);
        Ok(())
    }

    /// Set one inline style property, keeping the others
    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let mut block = self.inline_style(id);
        block.set(name, value);
        self.set_style_text(id, &block.to_css_text())
    }

    /// First connected element matching `selector`, in document order
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)
            .ok_or_else(|| Error::InvalidInput(format!("unsupported selector `{}`", selector)))?;
        Ok(self
            .element_descendants(self.root(), false)
            .into_iter()
            .filter(|&n| list.matches(self, n))
            .collect())
    }

    /// Serialize a node and its subtree back to HTML
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(data) = self.data(id) else {
            return;
        };
        match data {
            NodeData::Document => {
                out.push_str("<!DOCTYPE html>");
                for &c in self.children(id) {
                    self.write_html(c, out);
                }
            }
            NodeData::Text(t) => {
                let raw = self
                    .parent_element(id)
                    .and_then(|p| self.element(p))
                    .map(|e| e.name == "style" || e.name == "script")
                    .unwrap_or(false);
                if raw {
                    out.push_str(t);
                } else {
                    out.push_str(&escape(t, false));
                }
            }
            NodeData::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            NodeData::Element(e) => {
                out.push('<');
                out.push_str(&e.name);
                for (k, v) in e.attrs() {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v, true));
                    out.push('"');
                }
                out.push('>');
                if is_void(&e.name) && e.namespace == Namespace::Html {
                    return;
                }
                for &c in self.children(id) {
                    self.write_html(c, out);
                }
                out.push_str("</");
                out.push_str(&e.name);
                out.push('>');
            }
        }
    }
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
