//! Cascade and computed values.
//!
//! Every connected element resolves to one value per entry of [`PROPERTIES`]:
//! the cascaded value when one exists, otherwise the parent's computed value
//! for inherited properties, otherwise the initial value. Elements that are
//! not connected to the document resolve to an empty snapshot.

use super::color::{parse_color, ColorError};
use super::css::{Origin, Stylesheet};
use super::StyleSnapshot;
use crate::dom::{Document, NodeId};
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Color,
    Length,
    FontWeight,
    Keyword,
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub name: &'static str,
    pub initial: &'static str,
    pub inherited: bool,
    pub kind: ValueKind,
}

const fn prop(name: &'static str, initial: &'static str, inherited: bool, kind: ValueKind) -> PropertyDef {
    PropertyDef {
        name,
        initial,
        inherited,
        kind,
    }
}

use ValueKind::*;

/// Properties reported by the computed style, in enumeration order
pub const PROPERTIES: &[PropertyDef] = &[
    prop("display", "block", false, Keyword),
    prop("position", "static", false, Keyword),
    prop("top", "auto", false, Length),
    prop("right", "auto", false, Length),
    prop("bottom", "auto", false, Length),
    prop("left", "auto", false, Length),
    prop("box-sizing", "content-box", false, Keyword),
    prop("width", "auto", false, Length),
    prop("height", "auto", false, Length),
    prop("margin-top", "0px", false, Length),
    prop("margin-right", "0px", false, Length),
    prop("margin-bottom", "0px", false, Length),
    prop("margin-left", "0px", false, Length),
    prop("padding-top", "0px", false, Length),
    prop("padding-right", "0px", false, Length),
    prop("padding-bottom", "0px", false, Length),
    prop("padding-left", "0px", false, Length),
    prop("border-width", "medium", false, Length),
    prop("border-style", "none", false, Keyword),
    prop("border-color", "currentcolor", false, Color),
    prop("color", "rgb(0, 0, 0)", true, Color),
    prop("background-color", "transparent", false, Color),
    prop("background-image", "none", false, Keyword),
    prop("box-shadow", "none", false, Keyword),
    prop("opacity", "1", false, Keyword),
    prop("visibility", "visible", true, Keyword),
    prop("font-family", "sans-serif", true, Keyword),
    prop("font-size", "16px", true, Length),
    prop("font-weight", "400", true, FontWeight),
    prop("line-height", "normal", true, Keyword),
    prop("text-align", "start", true, Keyword),
];

const ROOT_FONT_SIZE: f32 = 16.0;

const USER_AGENT_CSS: &str = r#"
head, style, script, title, meta, link, template { display: none }
span, a, b, strong, i, em, small, code, label, img, svg, br { display: inline }
body { margin: 8px }
h1 { font-size: 2em; font-weight: bold; margin-top: 0.67em; margin-bottom: 0.67em }
h2 { font-size: 1.5em; font-weight: bold; margin-top: 0.83em; margin-bottom: 0.83em }
h3 { font-size: 1.17em; font-weight: bold; margin-top: 1em; margin-bottom: 1em }
p, ul, ol { margin-top: 1em; margin-bottom: 1em }
ul, ol { padding-left: 40px }
b, strong { font-weight: bold }
"#;

/// Parsed stylesheets of one document: the user-agent sheet followed by every
/// connected `<style>` element in document order.
#[derive(Debug, Clone)]
pub struct Cascade {
    sheets: Vec<Stylesheet>,
}

impl Cascade {
    pub fn new(doc: &Document) -> Self {
        let (ua, mut order) = Stylesheet::parse(USER_AGENT_CSS, Origin::UserAgent, 0);
        let mut sheets = vec![ua];
        for node in doc.element_descendants(doc.root(), false) {
            let is_style = doc.element(node).map(|e| e.name == "style").unwrap_or(false);
            if !is_style {
                continue;
            }
            let (sheet, next) = Stylesheet::parse(&doc.text_content(node), Origin::Author, order);
            order = next;
            sheets.push(sheet);
        }
        Self { sheets }
    }

    pub fn rule_count(&self) -> usize {
        self.sheets.iter().map(|s| s.rules.len()).sum()
    }

    /// Winning declared value per property for `node`
    fn cascaded(&self, doc: &Document, node: NodeId) -> HashMap<String, String> {
        // (level, specificity, order): higher wins
        let mut candidates: Vec<((u8, u32, u32), &str, &str)> = Vec::new();
        for sheet in &self.sheets {
            for rule in &sheet.rules {
                let Some(spec) = rule.selectors.matching_specificity(doc, node) else {
                    continue;
                };
                for d in rule.declarations.iter() {
                    let level = match (sheet.origin, d.important) {
                        (Origin::UserAgent, false) => 0,
                        (Origin::Author, false) => 1,
                        (Origin::Author, true) => 3,
                        (Origin::UserAgent, true) => 5,
                    };
                    candidates.push(((level, spec.0, rule.order), d.name.as_str(), d.value.as_str()));
                }
            }
        }
        candidates.sort_by_key(|c| c.0);

        let mut out = HashMap::new();
        let mut inline_important = Vec::new();
        let inline = doc.inline_style(node);
        let mut pending = candidates.into_iter().peekable();

        // Author normal < inline normal < author important < inline important
        while let Some((_, name, value)) = pending.next_if(|c| c.0 .0 <= 1) {
            out.insert(name.to_string(), value.to_string());
        }
        for d in inline.iter() {
            if d.important {
                inline_important.push(d);
            } else {
                out.insert(d.name.clone(), d.value.clone());
            }
        }
        while let Some((_, name, value)) = pending.next_if(|c| c.0 .0 <= 3) {
            out.insert(name.to_string(), value.to_string());
        }
        for d in inline_important {
            out.insert(d.name.clone(), d.value.clone());
        }
        for (_, name, value) in pending {
            out.insert(name.to_string(), value.to_string());
        }
        out
    }
}

/// Memoizing computed-style resolver over one document state
pub struct StyleResolver<'a> {
    doc: &'a Document,
    cascade: Cow<'a, Cascade>,
    cache: HashMap<NodeId, StyleSnapshot>,
}

impl<'a> StyleResolver<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            cascade: Cow::Owned(Cascade::new(doc)),
            cache: HashMap::new(),
        }
    }

    /// Reuse stylesheets parsed earlier; valid while no `<style>` changed
    pub fn with_cascade(doc: &'a Document, cascade: &'a Cascade) -> Self {
        Self {
            doc,
            cascade: Cow::Borrowed(cascade),
            cache: HashMap::new(),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn computed(&mut self, node: NodeId) -> StyleSnapshot {
        if let Some(hit) = self.cache.get(&node) {
            return hit.clone();
        }
        let snapshot = self.compute(node);
        self.cache.insert(node, snapshot.clone());
        snapshot
    }

    fn compute(&mut self, node: NodeId) -> StyleSnapshot {
        let doc = self.doc;
        if doc.element(node).is_none() || !doc.is_connected(node) {
            return StyleSnapshot::default();
        }
        let parent = doc.parent_element(node).map(|p| self.computed(p));
        let parent = parent.as_ref();
        let cascaded = self.cascade.cascaded(doc, node);

        let parent_font = parent
            .and_then(|p| p.get("font-size"))
            .and_then(px_value)
            .unwrap_or(ROOT_FONT_SIZE);
        let font_size = resolve_font_size(cascaded.get("font-size").map(String::as_str), parent, parent_font);
        let color = resolve_color(cascaded.get("color").map(String::as_str), parent);

        let mut entries = Vec::with_capacity(PROPERTIES.len());
        for def in PROPERTIES {
            let value = match def.name {
                "font-size" => format_px(font_size),
                "color" => color.clone(),
                _ => resolve(def, cascaded.get(def.name).map(String::as_str), parent, font_size, &color),
            };
            entries.push((def.name.to_string(), value));
        }

        let border_none = entries
            .iter()
            .any(|(k, v)| k == "border-style" && (v == "none" || v == "hidden"));
        if border_none {
            if let Some(w) = entries.iter_mut().find(|(k, _)| k == "border-width") {
                w.1 = "0px".to_string();
            }
        }
        StyleSnapshot::from_entries(entries)
    }
}

/// One-off computed style of `node`
pub fn computed_style(doc: &Document, node: NodeId) -> StyleSnapshot {
    StyleResolver::new(doc).computed(node)
}

fn inherited_or_initial(def: &PropertyDef, parent: Option<&StyleSnapshot>, font_size: f32, color: &str) -> String {
    if def.inherited {
        if let Some(v) = parent.and_then(|p| p.get(def.name)) {
            return v.to_string();
        }
    }
    compute_value(def, def.initial, font_size, color).unwrap_or_else(|| def.initial.to_string())
}

fn resolve(def: &PropertyDef, cascaded: Option<&str>, parent: Option<&StyleSnapshot>, font_size: f32, color: &str) -> String {
    match cascaded.map(|v| v.trim().to_ascii_lowercase()) {
        Some(k) if k == "inherit" => parent
            .and_then(|p| p.get(def.name))
            .map(str::to_string)
            .unwrap_or_else(|| inherited_or_initial(def, None, font_size, color)),
        Some(k) if k == "initial" => inherited_or_initial(def, None, font_size, color),
        Some(k) if k == "unset" => inherited_or_initial(def, parent, font_size, color),
        Some(_) => cascaded
            .and_then(|v| compute_value(def, v, font_size, color))
            .unwrap_or_else(|| inherited_or_initial(def, parent, font_size, color)),
        None => inherited_or_initial(def, parent, font_size, color),
    }
}

fn resolve_color(cascaded: Option<&str>, parent: Option<&StyleSnapshot>) -> String {
    let inherited = || {
        parent
            .and_then(|p| p.get("color"))
            .map(str::to_string)
            .unwrap_or_else(|| "rgb(0, 0, 0)".to_string())
    };
    match cascaded.map(str::trim) {
        None => inherited(),
        Some(v) if matches!(v.to_ascii_lowercase().as_str(), "inherit" | "unset" | "currentcolor") => inherited(),
        Some(v) if v.eq_ignore_ascii_case("initial") => "rgb(0, 0, 0)".to_string(),
        Some(v) => computed_color(v).unwrap_or_else(inherited),
    }
}

fn resolve_font_size(cascaded: Option<&str>, parent: Option<&StyleSnapshot>, parent_font: f32) -> f32 {
    let inherited = parent.map(|_| parent_font).unwrap_or(ROOT_FONT_SIZE);
    let Some(v) = cascaded.map(|v| v.trim().to_ascii_lowercase()) else {
        return inherited;
    };
    match v.as_str() {
        "inherit" | "unset" => inherited,
        "initial" | "medium" => ROOT_FONT_SIZE,
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "smaller" => parent_font / 1.2,
        "larger" => parent_font * 1.2,
        other => {
            if let Some(p) = other.strip_suffix('%') {
                p.parse::<f32>().map(|p| parent_font * p / 100.0).unwrap_or(inherited)
            } else {
                length_px(other, parent_font).unwrap_or(inherited)
            }
        }
    }
}

/// `None` when the value is invalid for the property
fn compute_value(def: &PropertyDef, raw: &str, font_size: f32, color: &str) -> Option<String> {
    let raw = raw.trim();
    match def.kind {
        Color => {
            if raw.eq_ignore_ascii_case("currentcolor") {
                Some(color.to_string())
            } else {
                computed_color(raw)
            }
        }
        Length => {
            let lower = raw.to_ascii_lowercase();
            match lower.as_str() {
                "auto" => Some("auto".into()),
                "thin" => Some("1px".into()),
                "medium" if def.name == "border-width" => Some("3px".into()),
                "thick" => Some("5px".into()),
                _ if lower.ends_with('%') => lower[..lower.len() - 1]
                    .parse::<f32>()
                    .ok()
                    .map(|_| lower.clone()),
                _ => length_px(&lower, font_size).map(format_px),
            }
        }
        FontWeight => match raw.to_ascii_lowercase().as_str() {
            "normal" => Some("400".into()),
            "bold" => Some("700".into()),
            "lighter" => Some("100".into()),
            "bolder" => Some("900".into()),
            n if n.parse::<u16>().is_ok() => Some(n.to_string()),
            _ => None,
        },
        Keyword => Some(raw.to_string()),
    }
}

/// Colors the engine understands serialize as `rgb()`; unsupported color
/// functions are kept verbatim; garbage is invalid.
fn computed_color(raw: &str) -> Option<String> {
    match parse_color(raw) {
        Ok(c) => Some(c.to_css()),
        Err(ColorError::Unsupported(v)) => Some(v),
        Err(ColorError::Invalid(_)) => None,
    }
}

/// Absolute length in px for px/em/rem/pt/unitless zero
pub fn length_px(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim();
    if v == "0" {
        return Some(0.0);
    }
    let (num, unit) = split_unit(v)?;
    match unit {
        "px" => Some(num),
        "em" => Some(num * font_size),
        "rem" => Some(num * ROOT_FONT_SIZE),
        "pt" => Some(num * 4.0 / 3.0),
        _ => None,
    }
}

fn split_unit(v: &str) -> Option<(f32, &str)> {
    let idx = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let num = v[..idx].parse::<f32>().ok()?;
    Some((num, &v[idx..]))
}

/// Parse a computed `Npx` value
pub fn px_value(value: &str) -> Option<f32> {
    value.trim().strip_suffix("px")?.parse::<f32>().ok()
}

pub fn format_px(v: f32) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    format!("{}px", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<html><head><style>
                .card { color: #102030; font-size: 20px; border: 1px solid red }
                .card p { margin: 1em 0 }
                #x { color: blue !important }
            </style></head>
            <body><div class="card"><p id="x" style="color: red; padding: 2px">hi</p><span style="color: oklch(0.5 0.1 200)">o</span></div></body></html>"#,
        )
    }

    #[test]
    fn inherits_and_resolves_relative_lengths() {
        let doc = doc();
        let p = doc.query_selector("p").unwrap().unwrap();
        let cs = computed_style(&doc, p);
        assert_eq!(cs.get("font-size"), Some("20px"));
        assert_eq!(cs.get("margin-top"), Some("20px"));
        assert_eq!(cs.get("padding-left"), Some("2px"));
        assert_eq!(cs.len(), PROPERTIES.len());
    }

    #[test]
    fn important_author_rule_beats_inline() {
        let doc = doc();
        let p = doc.query_selector("#x").unwrap().unwrap();
        assert_eq!(computed_style(&doc, p).get("color"), Some("rgb(0, 0, 255)"));
    }

    #[test]
    fn border_longhands_resolve_and_follow_color() {
        let doc = doc();
        let card = doc.query_selector(".card").unwrap().unwrap();
        let cs = computed_style(&doc, card);
        assert_eq!(cs.get("border-color"), Some("rgb(255, 0, 0)"));
        assert_eq!(cs.get("border-width"), Some("1px"));
        let span = doc.query_selector("span").unwrap().unwrap();
        let cs = computed_style(&doc, span);
        assert_eq!(cs.get("border-width"), Some("0px"));
        assert_eq!(cs.get("border-color"), Some("oklch(0.5 0.1 200)"));
    }

    #[test]
    fn detached_elements_have_no_computed_style() {
        let mut doc = doc();
        let div = doc.create_element("div");
        assert!(computed_style(&doc, div).is_empty());
    }

    #[test]
    fn display_none_for_metadata() {
        let doc = doc();
        let head = doc.head().unwrap();
        assert_eq!(computed_style(&doc, head).get("display"), Some("none"));
    }
}
