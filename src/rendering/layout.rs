//! Block layout over computed styles.
//!
//! Every rendered element becomes a block stacked below its previous sibling;
//! text nodes become line boxes wrapped at the advances of the face their
//! computed font resolves to. `<img>` and `<svg>` are replaced elements sized
//! from their style, attributes or decoded image. Margins do not collapse.

use crate::dom::{Document, NodeId};
use crate::rendering::fonts::{weight_value, FontFace, Fonts};
use crate::rendering::images::ImageSet;
use crate::style::computed::{length_px, px_value};
use crate::style::{StyleResolver, StyleSnapshot};
use crate::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxModel {
    pub margin: Edges,
    pub border: f32,
    pub padding: Edges,
}

/// Border box plus the edges around and inside it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutBox {
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_rect(&self) -> Rect {
        let b = self.box_model.border;
        let p = self.box_model.padding;
        Rect {
            x: self.rect.x + b + p.left,
            y: self.rect.y + b + p.top,
            width: (self.rect.width - 2.0 * b - p.horizontal()).max(0.0),
            height: (self.rect.height - 2.0 * b - p.vertical()).max(0.0),
        }
    }

    pub fn content_width(&self) -> f32 {
        self.content_rect().width
    }

    /// Vertical space taken in the parent's flow
    pub fn outer_height(&self) -> f32 {
        self.rect.height + self.box_model.margin.vertical()
    }
}

/// Paint-relevant values of an element box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
    pub background_color: String,
    pub border_color: String,
    pub border_style: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub lines: Vec<String>,
    pub font_family: String,
    pub font_weight: u16,
    pub font_size: f32,
    pub line_height: f32,
    pub color: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutContent {
    Block,
    Text(TextRun),
    Image { src: String },
    Svg,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub node: NodeId,
    pub lb: LayoutBox,
    pub content: LayoutContent,
    /// `None` for text boxes
    pub style: Option<BoxStyle>,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn find(&self, node: NodeId) -> Option<&LayoutNode> {
        if self.node == node {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(node))
    }
}

pub struct LayoutEngine<'a> {
    doc: &'a Document,
    resolver: StyleResolver<'a>,
    images: Option<&'a ImageSet>,
    fonts: &'a Fonts,
}

impl<'a> LayoutEngine<'a> {
    /// Engine measuring text with the system fonts
    pub fn new(doc: &'a Document, images: Option<&'a ImageSet>) -> Self {
        Self::with_fonts(doc, images, Fonts::global())
    }

    pub fn with_fonts(doc: &'a Document, images: Option<&'a ImageSet>, fonts: &'a Fonts) -> Self {
        Self {
            doc,
            resolver: StyleResolver::new(doc),
            images,
            fonts,
        }
    }

    /// Lay out the whole document at the viewport width
    pub fn layout_document(&mut self, viewport: Viewport) -> Option<LayoutNode> {
        let html = self.doc.document_element()?;
        self.layout_element(html, 0.0, 0.0, viewport.width as f32, false)
    }

    /// Lay out `node` as the root of its own surface: border box at the
    /// origin, its own margins and positioning offsets ignored.
    pub fn layout_root(&mut self, node: NodeId, viewport: Viewport) -> Option<LayoutNode> {
        self.layout_element(node, 0.0, 0.0, viewport.width as f32, true)
    }

    fn layout_element(&mut self, node: NodeId, x: f32, y: f32, containing_width: f32, as_root: bool) -> Option<LayoutNode> {
        let doc = self.doc;
        let el = doc.element(node)?;
        let cs = self.resolver.computed(node);
        if cs.get("display") == Some("none") {
            return None;
        }

        let font_size = cs.get("font-size").and_then(px_value).unwrap_or(16.0);
        let len = |name: &str| resolve_length(&cs, name, containing_width, font_size);
        let margin = if as_root {
            Edges::default()
        } else {
            Edges {
                top: len("margin-top").unwrap_or(0.0),
                right: len("margin-right").unwrap_or(0.0),
                bottom: len("margin-bottom").unwrap_or(0.0),
                left: len("margin-left").unwrap_or(0.0),
            }
        };
        let padding = Edges {
            top: len("padding-top").unwrap_or(0.0),
            right: len("padding-right").unwrap_or(0.0),
            bottom: len("padding-bottom").unwrap_or(0.0),
            left: len("padding-left").unwrap_or(0.0),
        };
        let border = cs.get("border-width").and_then(px_value).unwrap_or(0.0);
        let chrome_w = padding.horizontal() + 2.0 * border;
        let chrome_h = padding.vertical() + 2.0 * border;
        let border_box = cs.get("box-sizing") == Some("border-box");

        let (mut bx, mut by) = (x, y);
        let out_of_flow = !as_root && matches!(cs.get("position"), Some("absolute") | Some("fixed"));
        if out_of_flow {
            bx += len("left").unwrap_or(0.0);
            by += len("top").unwrap_or(0.0);
        }
        bx += margin.left;
        by += margin.top;

        let replaced = match el.name.as_str() {
            "img" => Some(self.intrinsic_image_size(node)),
            "svg" => Some(svg_size(doc, node)),
            _ => None,
        };

        let spec_w = len("width");
        let spec_h = len("height");
        let content_w = match (spec_w, replaced) {
            (Some(w), _) if border_box => (w - chrome_w).max(0.0),
            (Some(w), _) => w,
            (None, Some((iw, ih))) => match spec_h {
                Some(h) if ih > 0.0 => {
                    let h = if border_box { (h - chrome_h).max(0.0) } else { h };
                    h * iw / ih
                }
                _ => iw,
            },
            (None, None) => (containing_width - margin.horizontal() - chrome_w).max(0.0),
        };
        let content_x = bx + border + padding.left;
        let content_y = by + border + padding.top;

        let mut children = Vec::new();
        let (content, flow_h) = match (el.name.as_str(), replaced) {
            ("img", Some((iw, ih))) => {
                let src = el.attr("src").unwrap_or_default().to_string();
                let h = if spec_w.is_some() && iw > 0.0 { content_w * ih / iw } else { ih };
                (LayoutContent::Image { src }, h)
            }
            (_, Some((_, ih))) => (LayoutContent::Svg, ih),
            _ => {
                let mut cursor = content_y;
                for &child in doc.children(node) {
                    if doc.element(child).is_some() {
                        if let Some(laid) = self.layout_element(child, content_x, cursor, content_w, false) {
                            let child_cs = self.resolver.computed(child);
                            let child_flows = !matches!(child_cs.get("position"), Some("absolute") | Some("fixed"));
                            if child_flows {
                                cursor += laid.lb.outer_height();
                            }
                            children.push(laid);
                        }
                    } else if let Some(text) = doc.text(child) {
                        if let Some(laid) = self.layout_text(child, text, &cs, content_x, cursor, content_w) {
                            cursor += laid.lb.rect.height;
                            children.push(laid);
                        }
                    }
                }
                (LayoutContent::Block, cursor - content_y)
            }
        };

        let content_h = match spec_h {
            Some(h) if border_box => (h - chrome_h).max(0.0),
            Some(h) => h,
            None => flow_h,
        };

        let visible = cs.get("visibility") != Some("hidden");
        Some(LayoutNode {
            node,
            lb: LayoutBox {
                rect: Rect {
                    x: bx,
                    y: by,
                    width: content_w + chrome_w,
                    height: content_h + chrome_h,
                },
                box_model: BoxModel { margin, border, padding },
            },
            content,
            style: Some(BoxStyle {
                background_color: cs.get("background-color").unwrap_or("transparent").to_string(),
                border_color: cs.get("border-color").unwrap_or("transparent").to_string(),
                border_style: cs.get("border-style").unwrap_or("none").to_string(),
                visible,
            }),
            children,
        })
    }

    fn layout_text(
        &self,
        node: NodeId,
        text: &str,
        parent: &StyleSnapshot,
        x: f32,
        y: f32,
        width: f32,
    ) -> Option<LayoutNode> {
        if text.trim().is_empty() {
            return None;
        }
        let font_size = parent.get("font-size").and_then(px_value).unwrap_or(16.0);
        let line_height = line_height_px(parent.get("line-height"), font_size);
        let font_family = parent.get("font-family").unwrap_or("sans-serif").to_string();
        let font_weight = weight_value(parent.get("font-weight"));
        let face: FontFace = self.fonts.face(&font_family, font_weight);
        let lines = wrap_words(text, width, |line| face.text_width(line, font_size));
        let height = lines.len() as f32 * line_height;

        Some(LayoutNode {
            node,
            lb: LayoutBox {
                rect: Rect { x, y, width, height },
                box_model: BoxModel::default(),
            },
            content: LayoutContent::Text(TextRun {
                lines,
                font_family,
                font_weight,
                font_size,
                line_height,
                color: parent.get("color").unwrap_or("rgb(0, 0, 0)").to_string(),
                visible: parent.get("visibility") != Some("hidden"),
            }),
            style: None,
            children: Vec::new(),
        })
    }

    /// Natural size from attributes, then the decoded image, then nothing
    fn intrinsic_image_size(&self, node: NodeId) -> (f32, f32) {
        let el = match self.doc.element(node) {
            Some(el) => el,
            None => return (0.0, 0.0),
        };
        let attr = |name: &str| el.attr(name).and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok());
        let natural = el
            .attr("src")
            .and_then(|src| self.images.and_then(|set| set.natural_size(src)))
            .map(|(w, h)| (w as f32, h as f32));
        match (attr("width"), attr("height"), natural) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((nw, nh))) if nw > 0.0 => (w, w * nh / nw),
            (None, Some(h), Some((nw, nh))) if nh > 0.0 => (h * nw / nh, h),
            (_, _, Some(n)) => n,
            (w, h, None) => (w.unwrap_or(0.0), h.unwrap_or(0.0)),
        }
    }
}

fn resolve_length(cs: &StyleSnapshot, name: &str, containing_width: f32, font_size: f32) -> Option<f32> {
    let v = cs.get(name)?;
    if let Some(pct) = v.strip_suffix('%') {
        return pct.parse::<f32>().ok().map(|p| containing_width * p / 100.0);
    }
    length_px(v, font_size)
}

fn svg_size(doc: &Document, node: NodeId) -> (f32, f32) {
    let el = doc.element(node);
    let attr = |name: &str| {
        el.and_then(|e| e.attr(name))
            .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
    };
    (attr("width").unwrap_or(300.0), attr("height").unwrap_or(150.0))
}

/// Line height in px from a computed `line-height`
pub fn line_height_px(value: Option<&str>, font_size: f32) -> f32 {
    match value.map(str::trim) {
        None | Some("normal") => font_size * 1.2,
        Some(v) => match v.parse::<f32>() {
            Ok(factor) => factor * font_size,
            Err(_) => length_px(v, font_size).unwrap_or(font_size * 1.2),
        },
    }
}

/// Greedy word wrap at `max_width` as measured by `width_of`; overlong words
/// get their own line
pub fn wrap_words(text: &str, max_width: f32, width_of: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", cur, word);
        if width_of(&candidate) > max_width {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        } else {
            cur = candidate;
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Rendered border box of `node` within the document, as
/// `getBoundingClientRect` would report it once `images` have loaded.
/// Unrendered nodes measure empty.
pub fn measure(doc: &Document, node: NodeId, viewport: Viewport, images: Option<&ImageSet>) -> Rect {
    let mut engine = LayoutEngine::new(doc, images);
    engine
        .layout_document(viewport)
        .and_then(|tree| tree.find(node).map(|n| n.lb.rect))
        .unwrap_or_default()
}
