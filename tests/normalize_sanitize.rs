//! Snapshot normalization followed by color sanitization on a resume page

use resume_export::style::computed_style;
use resume_export::{normalize, sanitize, ColorPolicy, Document};

const PAGE: &str = r#"<html><head><style>
  :root { color: black }
  .preview { color: oklch(0.25 0.02 260); font-size: 14px }
  .preview .title { color: oklch(0.55 0.2 265); font-size: 2em; border: 1px solid oklch(0.9 0 0) }
  .preview li { background-color: oklch(0.97 0.01 100); margin: 2px }
  .preview .muted { color: #6b7280 }
</style></head><body>
<main>
  <div id="resume-preview" class="preview">
    <h1 class="title">Jane Doe</h1>
    <p class="muted">Backend engineer</p>
    <ul><li>Rust</li><li>Go</li></ul>
    <svg width="10" height="10"><rect width="10" height="10" fill="oklch(0.6 0.1 30)" stroke="oklch(0.2 0 0)"></rect></svg>
  </div>
  <p id="outside" style="color: oklch(0.5 0.1 10)">untouched</p>
</main>
</body></html>"#;

fn run_pipeline(doc: &mut Document) -> (usize, usize) {
    let policy = ColorPolicy::default();
    let root = doc.query_selector("#resume-preview").unwrap().unwrap();
    let inlined = normalize::inline_all_computed_styles(doc, root, &policy).unwrap();
    let fixed = sanitize::fix_unsupported_colors(doc, Some(root), &policy).unwrap();
    (inlined, fixed)
}

#[test]
fn no_unsupported_color_left_in_descendants() {
    let mut doc = Document::parse(PAGE);
    let (inlined, fixed) = run_pipeline(&mut doc);
    assert_eq!(inlined, 8);
    assert!(fixed > 0);

    let root = doc.query_selector("#resume-preview").unwrap().unwrap();
    for node in doc.element_descendants(root, false) {
        let cs = computed_style(&doc, node);
        for (prop, value) in cs.iter() {
            assert!(!value.contains("oklch("), "{} of node {:?} is {}", prop, node, value);
        }
        let inline = doc.inline_style(node);
        assert!(inline.iter().all(|d| !d.value.contains("oklch(")));
        let el = doc.element(node).unwrap();
        for attr in ["fill", "stroke"] {
            assert!(!el.attr(attr).unwrap_or_default().contains("oklch("));
        }
    }
}

#[test]
fn root_keeps_its_stylesheet_color() {
    // the root is normalized but not sanitized; the capture override covers it
    let mut doc = Document::parse(PAGE);
    run_pipeline(&mut doc);
    let root = doc.query_selector("#resume-preview").unwrap().unwrap();
    assert!(doc.inline_style(root).get("color").is_none());
    assert!(computed_style(&doc, root).get("color").unwrap().contains("oklch("));
}

#[test]
fn supported_values_survive_as_computed_values() {
    let mut doc = Document::parse(PAGE);
    run_pipeline(&mut doc);
    let muted = doc.query_selector(".muted").unwrap().unwrap();
    assert_eq!(doc.inline_style(muted).get("color"), Some("rgb(107, 114, 128)"));
    assert_eq!(doc.inline_style(muted).get("font-size"), Some("14px"));

    let title = doc.query_selector(".title").unwrap().unwrap();
    let inline = doc.inline_style(title);
    assert_eq!(inline.get("font-size"), Some("28px"));
    assert_eq!(inline.get("border-width"), Some("1px"));
    assert_eq!(inline.get("color"), Some("#000"));
}

#[test]
fn elements_outside_the_root_are_not_touched() {
    let mut doc = Document::parse(PAGE);
    let outside = doc.query_selector("#outside").unwrap().unwrap();
    let before = doc.outer_html(outside);
    run_pipeline(&mut doc);
    assert_eq!(doc.outer_html(outside), before);
}

#[test]
fn rerunning_the_pipeline_keeps_computed_styles() {
    let mut doc = Document::parse(PAGE);
    run_pipeline(&mut doc);
    let root = doc.query_selector("#resume-preview").unwrap().unwrap();
    let snapshot = |doc: &Document| -> Vec<_> {
        doc.element_descendants(root, true)
            .into_iter()
            .map(|n| computed_style(doc, n))
            .collect()
    };
    let once = snapshot(&doc);
    let (_, fixed) = run_pipeline(&mut doc);
    assert_eq!(snapshot(&doc), once);
    // every descendant now carries its colors inline
    assert_eq!(fixed, 0);
}
