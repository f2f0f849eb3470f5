//! Software rasterizer: paints a display list into a tiny-skia pixmap

use crate::rendering::fonts::{FontFace, Fonts};
use crate::rendering::images::ImageSet;
use crate::rendering::layout::Rect;
use crate::rendering::paint::{PaintCommand, SvgShape};
use crate::rendering::{RasterImage, RasterOptions};
use crate::style::color::{parse_color, Rgba};
use crate::{Error, Result};
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Stroke, Transform,
};

fn color_of(value: &str) -> Result<Rgba> {
    parse_color(value).map_err(|e| Error::RenderError(e.to_string()))
}

/// `None` for fully transparent colors, which paint nothing
fn paint_of(value: &str) -> Result<Option<Paint<'static>>> {
    let c = color_of(value)?;
    if c.is_transparent() {
        return Ok(None);
    }
    let mut paint = Paint::default();
    paint.set_color_rgba8(c.r, c.g, c.b, c.a);
    paint.anti_alias = true;
    Ok(Some(paint))
}

fn skia_rect(r: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height)
}

/// A glyph's coverage tinted with `color`, ready to composite
fn glyph_pixmap(coverage: &[u8], width: usize, height: usize, color: Rgba) -> Option<Pixmap> {
    let mut glyph = Pixmap::new(width as u32, height as u32)?;
    for (px, &cov) in glyph.pixels_mut().iter_mut().zip(coverage) {
        let a = (cov as u32 * color.a as u32 / 255) as u8;
        let premul = |c: u8| (c as u32 * a as u32 / 255) as u8;
        if let Some(p) = PremultipliedColorU8::from_rgba(premul(color.r), premul(color.g), premul(color.b), a) {
            *px = p;
        }
    }
    Some(glyph)
}

/// Draw one line with `face`, laid out in CSS px and painted at device
/// resolution so glyphs stay sharp under oversampling
#[allow(clippy::too_many_arguments)]
fn draw_text_line(
    pixmap: &mut Pixmap,
    face: &FontFace,
    text: &str,
    (x, y): (f32, f32),
    font_size: f32,
    line_height: f32,
    color: Rgba,
    scale: f32,
) {
    let metrics = face.line_metrics(font_size);
    let half_leading = (line_height - (metrics.ascent + metrics.descent)) / 2.0;
    let baseline = y + half_leading + metrics.ascent;
    let (pens, _) = face.pen_positions(text, font_size);

    if face.is_fallback() {
        // no installed face: solid cells at the fallback advance
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        let mut pb = PathBuilder::new();
        for (ch, pen) in &pens {
            if ch.is_whitespace() {
                continue;
            }
            let advance = face.advance(*ch, font_size);
            let top = baseline - metrics.ascent * 0.875;
            if let Some(r) = tiny_skia::Rect::from_xywh(x + pen + advance * 0.1, top, advance * 0.8, metrics.ascent * 0.875) {
                pb.push_rect(r);
            }
        }
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::from_scale(scale, scale), None);
        }
        return;
    }

    let device_px = font_size * scale;
    let device_baseline = (baseline * scale).round() as i32;
    for (ch, pen) in pens {
        let Some(glyph) = face.rasterize(ch, device_px) else {
            continue;
        };
        let Some(tinted) = glyph_pixmap(&glyph.coverage, glyph.width, glyph.height, color) else {
            continue;
        };
        let gx = ((x + pen) * scale).round() as i32 + glyph.left;
        let gy = device_baseline - glyph.top;
        pixmap.draw_pixmap(gx, gy, tinted.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    }
}

/// Paint `commands` over a `width` x `height` CSS-pixel surface scaled by
/// `opts.scale`, and encode the result as a PNG data URI. Text is drawn with
/// the system fonts.
pub fn rasterize_display_list(
    commands: &[PaintCommand],
    width: f32,
    height: f32,
    opts: &RasterOptions,
    images: &ImageSet,
) -> Result<RasterImage> {
    rasterize_with_fonts(commands, width, height, opts, images, Fonts::global())
}

/// [`rasterize_display_list`] resolving text faces from `fonts`
pub fn rasterize_with_fonts(
    commands: &[PaintCommand],
    width: f32,
    height: f32,
    opts: &RasterOptions,
    images: &ImageSet,
    fonts: &Fonts,
) -> Result<RasterImage> {
    let px_w = (width * opts.scale).ceil();
    let px_h = (height * opts.scale).ceil();
    if !(px_w >= 1.0 && px_h >= 1.0) {
        return Err(Error::RenderError(format!(
            "cannot rasterize an empty surface ({}x{})",
            width, height
        )));
    }
    let mut pixmap = Pixmap::new(px_w as u32, px_h as u32)
        .ok_or_else(|| Error::RenderError(format!("surface too large ({}x{})", px_w, px_h)))?;

    let bg = color_of(&opts.background)?;
    pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

    let ts = Transform::from_scale(opts.scale, opts.scale);
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { rect, color } => {
                if let (Some(paint), Some(r)) = (paint_of(color)?, skia_rect(*rect)) {
                    pixmap.fill_rect(r, &paint, ts, None);
                }
            }
            PaintCommand::Border { rect, width, color } => {
                let Some(paint) = paint_of(color)? else {
                    continue;
                };
                let w = *width;
                let edges = [
                    Rect { height: w, ..*rect },
                    Rect { y: rect.y + rect.height - w, height: w, ..*rect },
                    Rect { y: rect.y + w, width: w, height: rect.height - 2.0 * w, ..*rect },
                    Rect {
                        x: rect.x + rect.width - w,
                        y: rect.y + w,
                        width: w,
                        height: rect.height - 2.0 * w,
                    },
                ];
                for edge in edges.iter().filter_map(|e| skia_rect(*e)) {
                    pixmap.fill_rect(edge, &paint, ts, None);
                }
            }
            PaintCommand::Text {
                x,
                y,
                text,
                font_family,
                font_weight,
                font_size,
                line_height,
                color,
            } => {
                let c = color_of(color)?;
                if c.is_transparent() {
                    continue;
                }
                let face = fonts.face(font_family, *font_weight);
                draw_text_line(&mut pixmap, &face, text, (*x, *y), *font_size, *line_height, c, opts.scale);
            }
            PaintCommand::Image { rect, src } => {
                let Some(img) = images.get(src) else {
                    continue;
                };
                if rect.width <= 0.0 || rect.height <= 0.0 {
                    continue;
                }
                let fit = ts
                    .pre_translate(rect.x, rect.y)
                    .pre_scale(rect.width / img.width() as f32, rect.height / img.height() as f32);
                let pp = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                pixmap.draw_pixmap(0, 0, img.as_ref(), &pp, fit, None);
            }
            PaintCommand::Shape { shape, fill, stroke, stroke_width } => {
                let path = match shape {
                    SvgShape::Rect(r) => skia_rect(*r).map(PathBuilder::from_rect),
                    SvgShape::Circle { cx, cy, r } => PathBuilder::from_circle(*cx, *cy, *r),
                };
                let Some(path) = path else {
                    continue;
                };
                if let Some(fill) = fill {
                    if let Some(paint) = paint_of(fill)? {
                        pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
                    }
                }
                if let Some(stroke) = stroke {
                    if let Some(paint) = paint_of(stroke)? {
                        let s = Stroke {
                            width: *stroke_width,
                            ..Stroke::default()
                        };
                        pixmap.stroke_path(&path, &paint, &s, ts, None);
                    }
                }
            }
        }
    }

    let png = pixmap
        .encode_png()
        .map_err(|e| Error::RenderError(format!("PNG encoding failed: {}", e)))?;
    Ok(RasterImage::from_png(pixmap.width(), pixmap.height(), &png))
}
