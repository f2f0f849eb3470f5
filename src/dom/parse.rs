//! HTML parsing into the arena via scraper (html5ever)

use super::{Document, Namespace};
use scraper::Html;
use std::collections::HashMap;

pub(super) fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();
    let mut ids = HashMap::new();

    let root = parsed.tree.root();
    ids.insert(root.id(), doc.root());

    // Pre-order walk: a parent is always mapped before its children.
    for node in root.descendants().skip(1) {
        let parent = match node.parent().and_then(|p| ids.get(&p.id()).copied()) {
            Some(p) => p,
            None => continue,
        };
        let created = match node.value() {
            scraper::Node::Element(el) => {
                let in_svg = doc.element(parent).map(|p| p.is_svg()).unwrap_or(false);
                let ns = if in_svg || el.name().eq_ignore_ascii_case("svg") {
                    Namespace::Svg
                } else {
                    Namespace::Html
                };
                let id = doc.create_element_ns(el.name(), ns);
                if let Some(data) = doc.element_mut(id) {
                    for (k, v) in el.attrs() {
                        data.set_attr(k, v);
                    }
                }
                id
            }
            scraper::Node::Text(t) => doc.create_text(t),
            scraper::Node::Comment(c) => doc.create_comment(c),
            _ => continue,
        };
        if doc.append_child(parent, created).is_ok() {
            ids.insert(node.id(), created);
        }
    }

    log::debug!("parsed document with {} nodes", ids.len());
    doc
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, Namespace};

    #[test]
    fn parse_builds_head_and_body() {
        let doc = Document::parse("<title>T</title><p class=\"a b\">Hello</p>");
        assert!(doc.head().is_some());
        let body = doc.body().expect("body");
        let p = doc.query_selector("p.b").unwrap().expect("p");
        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.text_content(p), "Hello");
    }

    #[test]
    fn svg_subtree_gets_svg_namespace() {
        let doc = Document::parse(
            "<body><svg width=10 height=10><circle cx=5 cy=5 r=4 fill=red></circle></svg><div></div></body>",
        );
        let circle = doc.query_selector("circle").unwrap().unwrap();
        let div = doc.query_selector("div").unwrap().unwrap();
        assert_eq!(doc.element(circle).unwrap().namespace, Namespace::Svg);
        assert_eq!(doc.element(div).unwrap().namespace, Namespace::Html);
    }
}
