//! DOM snapshot normalizer.
//!
//! Replaces the inline style of an element and all of its descendants with
//! the projection of their computed style, leaving out any property whose
//! value uses an unsupported color function. A dropped property falls back to
//! whatever the stylesheets or defaults give it.

use crate::dom::{Document, NodeId};
use crate::style::StyleResolver;
use crate::{ColorPolicy, Error, Result};

/// Inline the computed style of `root` and every element below it.
///
/// Any existing inline style is discarded. Returns the number of elements
/// rewritten. Calling it again on the same subtree yields the same styles.
pub fn inline_all_computed_styles(doc: &mut Document, root: NodeId, policy: &ColorPolicy) -> Result<usize> {
    if doc.element(root).is_none() {
        return Err(Error::InvalidInput("normalization root must be an element".into()));
    }
    let nodes = doc.element_descendants(root, true);

    // Writing a computed value back inline never changes the computed style of
    // a descendant, so all snapshots can be taken against the current state.
    let mut resolver = StyleResolver::new(doc);
    let rewritten: Vec<(NodeId, String)> = nodes
        .iter()
        .map(|&node| {
            let snapshot = resolver.computed(node);
            let css = snapshot.to_css_text(|_, value| !policy.is_unsupported(value));
            (node, css)
        })
        .collect();
    drop(resolver);

    let mut dropped = 0usize;
    for (node, css) in &rewritten {
        doc.set_style_text(*node, css)?;
        if css.is_empty() {
            dropped += 1;
        }
    }
    log::debug!(
        "inlined computed styles for {} elements ({} without computed style)",
        rewritten.len(),
        dropped
    );
    Ok(rewritten.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{computed_style, PROPERTIES};

    const HTML: &str = r#"<html><head><style>
        .resume { color: oklch(0.4 0.1 250); background-color: #eee; padding: 4px }
        .resume h2 { border: 1px solid oklch(0.7 0.2 30) }
    </style></head><body>
        <div class="resume" style="margin: 3px"><h2>Experience</h2><p>Text</p></div>
    </body></html>"#;

    #[test]
    fn snapshot_replaces_inline_style_and_drops_unsupported() {
        let mut doc = Document::parse(HTML);
        let root = doc.query_selector(".resume").unwrap().unwrap();
        let count = inline_all_computed_styles(&mut doc, root, &ColorPolicy::default()).unwrap();
        assert_eq!(count, 3);

        let inline = doc.inline_style(root);
        assert_eq!(inline.get("background-color"), Some("rgb(238, 238, 238)"));
        assert_eq!(inline.get("margin-top"), Some("3px"));
        assert!(inline.get("color").is_none());
        assert!(inline.get("border-color").is_none());

        let h2 = doc.query_selector("h2").unwrap().unwrap();
        let h2_inline = doc.inline_style(h2);
        assert!(h2_inline.iter().all(|d| !d.value.contains("oklch(")));
        assert_eq!(h2_inline.get("border-width"), Some("1px"));
    }

    #[test]
    fn property_set_is_computed_minus_unsupported() {
        let mut doc = Document::parse(HTML);
        let root = doc.query_selector(".resume").unwrap().unwrap();
        let p = doc.query_selector("p").unwrap().unwrap();
        let before = computed_style(&doc, p);
        inline_all_computed_styles(&mut doc, root, &ColorPolicy::default()).unwrap();

        let inline = doc.inline_style(p);
        let expected: Vec<&str> = before
            .iter()
            .filter(|(_, v)| !v.contains("oklch("))
            .map(|(k, _)| k)
            .collect();
        let actual: Vec<&str> = inline.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(actual, expected);
        assert!(actual.len() < PROPERTIES.len());
    }

    #[test]
    fn repeated_normalization_is_stable() {
        let mut doc = Document::parse(HTML);
        let root = doc.query_selector(".resume").unwrap().unwrap();
        let policy = ColorPolicy::default();
        inline_all_computed_styles(&mut doc, root, &policy).unwrap();
        let first = doc.outer_html(root);
        inline_all_computed_styles(&mut doc, root, &policy).unwrap();
        assert_eq!(doc.outer_html(root), first);
    }

    #[test]
    fn leaf_root_and_detached_root() {
        let mut doc = Document::parse("<body><span style=\"color: red\">x</span></body>");
        let span = doc.query_selector("span").unwrap().unwrap();
        assert_eq!(inline_all_computed_styles(&mut doc, span, &ColorPolicy::default()).unwrap(), 1);
        assert_eq!(doc.inline_style(span).get("color"), Some("rgb(255, 0, 0)"));

        let detached = doc.create_element("div");
        doc.set_style_text(detached, "color: red").unwrap();
        inline_all_computed_styles(&mut doc, detached, &ColorPolicy::default()).unwrap();
        assert!(doc.inline_style(detached).is_empty());
    }
}
