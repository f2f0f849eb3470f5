//! Color sanitizer: rewrites colors in unsupported color functions.

use crate::dom::{Document, NodeId};
use crate::style::{Cascade, StyleResolver};
use crate::{ColorPolicy, Error, Result};

/// Computed color properties checked on every element
pub const COLOR_PROPERTIES: [&str; 3] = ["color", "background-color", "border-color"];

/// Presentation attributes checked on SVG elements
pub const SVG_PAINT_ATTRIBUTES: [&str; 2] = ["fill", "stroke"];

/// Replace unsupported colors below `root` with the policy fallback.
///
/// Each descendant (the root itself is not visited) whose computed `color`,
/// `background-color` or `border-color` contains the policy token gets that
/// inline property set to the fallback. SVG elements also get their `fill`
/// and `stroke` attributes rewritten. `None` is a no-op. Returns the number
/// of values rewritten.
pub fn fix_unsupported_colors(doc: &mut Document, root: Option<NodeId>, policy: &ColorPolicy) -> Result<usize> {
    let Some(root) = root else {
        return Ok(0);
    };
    if doc.element(root).is_none() {
        return Err(Error::InvalidInput("sanitizer root must be an element".into()));
    }

    let cascade = Cascade::new(doc);
    let mut rewrites = 0usize;
    for node in doc.element_descendants(root, false) {
        // Fresh resolver per element: earlier rewrites change what inherits.
        let computed = StyleResolver::with_cascade(doc, &cascade).computed(node);
        let bad_props: Vec<&str> = COLOR_PROPERTIES
            .iter()
            .copied()
            .filter(|p| computed.get(p).map(|v| policy.is_unsupported(v)).unwrap_or(false))
            .collect();
        for prop in bad_props {
            doc.set_style_property(node, prop, &policy.fallback)?;
            rewrites += 1;
        }

        let Some(el) = doc.element_mut(node) else {
            continue;
        };
        if !el.is_svg() {
            continue;
        }
        for attr in SVG_PAINT_ATTRIBUTES {
            let bad = el.attr(attr).map(|v| policy.is_unsupported(v)).unwrap_or(false);
            if bad {
                el.set_attr(attr, &policy.fallback);
                rewrites += 1;
            }
        }
    }

    if rewrites > 0 {
        log::debug!("replaced {} unsupported color values with {}", rewrites, policy.fallback);
    }
    Ok(rewrites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::computed_style;

    #[test]
    fn span_with_oklch_color_gets_fallback() {
        let mut doc = Document::parse(
            r#"<body><div id="r"><span style="color: oklch(0.5 0.1 200)">x</span></div></body>"#,
        );
        let root = doc.query_selector("#r").unwrap();
        let n = fix_unsupported_colors(&mut doc, root, &ColorPolicy::default()).unwrap();
        let span = doc.query_selector("span").unwrap().unwrap();
        let inline = doc.inline_style(span);
        assert_eq!(inline.get("color"), Some("#000"));
        assert!(!doc.outer_html(span).contains("oklch("));
        // border-color followed color before the rewrite
        assert_eq!(n, 2);
    }

    #[test]
    fn svg_paint_attributes_are_rewritten() {
        let mut doc = Document::parse(
            r##"<body><div id="r"><svg><circle fill="oklch(0.6 0.1 20)" stroke="#333" r="3"></circle></svg><p data-x="oklch(1 0 0)">t</p></div></body>"##,
        );
        let root = doc.query_selector("#r").unwrap();
        fix_unsupported_colors(&mut doc, root, &ColorPolicy::default()).unwrap();
        let circle = doc.query_selector("circle").unwrap().unwrap();
        let el = doc.element(circle).unwrap();
        assert_eq!(el.attr("fill"), Some("#000"));
        assert_eq!(el.attr("stroke"), Some("#333"));
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(doc.element(p).unwrap().attr("data-x"), Some("oklch(1 0 0)"));
    }

    #[test]
    fn clean_documents_are_untouched() {
        let html = r#"<body><div id="r"><p style="color: rgb(1, 2, 3)">a</p></div></body>"#;
        let mut doc = Document::parse(html);
        let root = doc.query_selector("#r").unwrap();
        let before = doc.outer_html(doc.root());
        assert_eq!(fix_unsupported_colors(&mut doc, root, &ColorPolicy::default()).unwrap(), 0);
        assert_eq!(doc.outer_html(doc.root()), before);
    }

    #[test]
    fn none_root_is_noop() {
        let mut doc = Document::parse("<body></body>");
        assert_eq!(fix_unsupported_colors(&mut doc, None, &ColorPolicy::default()).unwrap(), 0);
    }

    #[test]
    fn inherited_unsupported_color_is_fixed_once_at_top() {
        let mut doc = Document::parse(
            r#"<html><head><style>.r { color: oklch(0.3 0 0) }</style></head>
               <body><div class="r" id="r"><section><p>deep</p></section></div></body></html>"#,
        );
        let root = doc.query_selector("#r").unwrap();
        fix_unsupported_colors(&mut doc, root, &ColorPolicy::default()).unwrap();
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(computed_style(&doc, p).get("color"), Some("rgb(0, 0, 0)"));
        assert!(doc.inline_style(p).get("color").is_none());
    }
}
