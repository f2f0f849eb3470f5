//! Display list built from a layout tree

use crate::dom::{Document, NodeId};
use crate::rendering::layout::{LayoutContent, LayoutNode, Rect};

#[derive(Debug, Clone, PartialEq)]
pub enum SvgShape {
    Rect(Rect),
    Circle { cx: f32, cy: f32, r: f32 },
}

/// Colors stay as CSS strings; the rasterizer parses them
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        color: String,
    },
    Border {
        rect: Rect,
        width: f32,
        color: String,
    },
    /// One line of text; `y` is the top of its line box
    Text {
        x: f32,
        y: f32,
        text: String,
        font_family: String,
        font_weight: u16,
        font_size: f32,
        line_height: f32,
        color: String,
    },
    Image {
        rect: Rect,
        src: String,
    },
    Shape {
        shape: SvgShape,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f32,
    },
}

/// Flatten `root` into paint order: background, border, then content and
/// children, depth first.
pub fn build_display_list(doc: &Document, root: &LayoutNode) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    paint_node(doc, root, &mut out);
    out
}

fn paint_node(doc: &Document, node: &LayoutNode, out: &mut Vec<PaintCommand>) {
    let visible = match (&node.style, &node.content) {
        (Some(style), _) => style.visible,
        (None, LayoutContent::Text(run)) => run.visible,
        (None, _) => true,
    };

    if visible {
        if let Some(style) = &node.style {
            out.push(PaintCommand::SolidRect {
                rect: node.lb.rect,
                color: style.background_color.clone(),
            });
            let border = node.lb.box_model.border;
            if border > 0.0 && !matches!(style.border_style.as_str(), "none" | "hidden") {
                out.push(PaintCommand::Border {
                    rect: node.lb.rect,
                    width: border,
                    color: style.border_color.clone(),
                });
            }
        }

        match &node.content {
            LayoutContent::Text(run) => {
                for (i, line) in run.lines.iter().enumerate() {
                    out.push(PaintCommand::Text {
                        x: node.lb.rect.x,
                        y: node.lb.rect.y + i as f32 * run.line_height,
                        text: line.clone(),
                        font_family: run.font_family.clone(),
                        font_weight: run.font_weight,
                        font_size: run.font_size,
                        line_height: run.line_height,
                        color: run.color.clone(),
                    });
                }
            }
            LayoutContent::Image { src } if !src.is_empty() => out.push(PaintCommand::Image {
                rect: node.lb.content_rect(),
                src: src.clone(),
            }),
            LayoutContent::Svg => paint_svg(doc, node.node, node.lb.content_rect(), out),
            _ => {}
        }
    }

    // visibility is inherited but a child may turn itself back on
    for child in &node.children {
        paint_node(doc, child, out);
    }
}

fn num_attr(doc: &Document, node: NodeId, name: &str) -> Option<f32> {
    doc.element(node)?
        .attr(name)?
        .trim()
        .trim_end_matches("px")
        .parse()
        .ok()
}

fn paint_attr(doc: &Document, node: NodeId, name: &str, default: Option<&str>) -> Option<String> {
    let value = doc
        .element(node)
        .and_then(|e| e.attr(name))
        .or(default)?
        .trim();
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Basic shapes only; coordinates are taken in the svg's content box
fn paint_svg(doc: &Document, svg: NodeId, origin: Rect, out: &mut Vec<PaintCommand>) {
    for node in doc.element_descendants(svg, false) {
        let Some(el) = doc.element(node) else {
            continue;
        };
        let shape = match el.name.as_str() {
            "rect" => SvgShape::Rect(Rect {
                x: origin.x + num_attr(doc, node, "x").unwrap_or(0.0),
                y: origin.y + num_attr(doc, node, "y").unwrap_or(0.0),
                width: num_attr(doc, node, "width").unwrap_or(0.0),
                height: num_attr(doc, node, "height").unwrap_or(0.0),
            }),
            "circle" => SvgShape::Circle {
                cx: origin.x + num_attr(doc, node, "cx").unwrap_or(0.0),
                cy: origin.y + num_attr(doc, node, "cy").unwrap_or(0.0),
                r: num_attr(doc, node, "r").unwrap_or(0.0),
            },
            _ => continue,
        };
        out.push(PaintCommand::Shape {
            shape,
            fill: paint_attr(doc, node, "fill", Some("black")),
            stroke: paint_attr(doc, node, "stroke", None),
            stroke_width: num_attr(doc, node, "stroke-width").unwrap_or(1.0),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::LayoutEngine;
    use crate::Viewport;

    fn display_list(html: &str, selector: &str) -> Vec<PaintCommand> {
        let doc = Document::parse(html);
        let root = doc.query_selector(selector).unwrap().unwrap();
        let tree = LayoutEngine::new(&doc, None)
            .layout_root(root, Viewport::default())
            .unwrap();
        build_display_list(&doc, &tree)
    }

    #[test]
    fn background_border_and_text_in_order() {
        let cmds = display_list(
            "<body><div id=r style=\"background-color: #ff0000; border: 1px solid blue\">hi there</div></body>",
            "#r",
        );
        match &cmds[0] {
            PaintCommand::SolidRect { color, rect } => {
                assert_eq!(color, "rgb(255, 0, 0)");
                assert_eq!((rect.x, rect.y), (0.0, 0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&cmds[1], PaintCommand::Border { width, color, .. } if *width == 1.0 && color == "rgb(0, 0, 255)"));
        assert!(matches!(&cmds[2], PaintCommand::Text { text, .. } if text == "hi there"));
    }

    #[test]
    fn svg_shapes_keep_their_paint() {
        let cmds = display_list(
            "<body><div id=r><svg width=20 height=20><circle cx=10 cy=10 r=5 fill=\"#00ff00\" stroke=\"none\"></circle></svg></div></body>",
            "#r",
        );
        let shape = cmds
            .iter()
            .find(|c| matches!(c, PaintCommand::Shape { .. }))
            .unwrap();
        match shape {
            PaintCommand::Shape { shape, fill, stroke, .. } => {
                assert_eq!(*shape, SvgShape::Circle { cx: 10.0, cy: 10.0, r: 5.0 });
                assert_eq!(fill.as_deref(), Some("#00ff00"));
                assert!(stroke.is_none());
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn hidden_boxes_paint_nothing_of_their_own() {
        let cmds = display_list(
            "<body><div id=r style=\"visibility: hidden; background-color: red\">x</div></body>",
            "#r",
        );
        assert!(cmds.is_empty());
    }
}
