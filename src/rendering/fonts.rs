//! Font discovery, text measurement and glyph coverage.
//!
//! Faces are looked up in the system font database through `fontdb` and
//! rasterized with `fontdue`. A family list that matches nothing installed
//! yields a fallback face with fixed half-em advances, which the rasterizer
//! paints as solid glyph cells. Layout and paint always go through the same
//! [`FontFace`], so wrapped lines fit the widths they were measured at.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Advance of one character for the fallback face, in ems
pub const FALLBACK_ADVANCE_EM: f32 = 0.5;

const FALLBACK_ASCENT_EM: f32 = 0.8;
const FALLBACK_DESCENT_EM: f32 = 0.2;

/// Installed families tried after the requested ones, per generic family
const SANS_FALLBACKS: &[&str] = &["DejaVu Sans", "Liberation Sans", "Noto Sans", "Arial", "Helvetica"];
const SERIF_FALLBACKS: &[&str] = &["DejaVu Serif", "Liberation Serif", "Noto Serif", "Times New Roman", "Times"];
const MONO_FALLBACKS: &[&str] = &["DejaVu Sans Mono", "Liberation Mono", "Noto Sans Mono", "Courier New"];

static SYSTEM: OnceLock<Fonts> = OnceLock::new();

/// Vertical metrics of a face at one size, in px
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    /// Positive, below the baseline
    pub descent: f32,
}

/// Coverage bitmap of one glyph, positioned relative to the pen on the baseline
pub struct GlyphBitmap {
    pub left: i32,
    /// Distance from the baseline up to the bitmap's top row
    pub top: i32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

/// A resolved face. Cheap to clone.
#[derive(Clone)]
pub struct FontFace {
    font: Option<Arc<Font>>,
}

impl FontFace {
    pub fn fallback() -> Self {
        Self { font: None }
    }

    pub fn is_fallback(&self) -> bool {
        self.font.is_none()
    }

    pub fn advance(&self, ch: char, px: f32) -> f32 {
        match &self.font {
            Some(font) => font.metrics(ch, px).advance_width,
            None => px * FALLBACK_ADVANCE_EM,
        }
    }

    fn kern(&self, prev: Option<char>, ch: char, px: f32) -> f32 {
        match (&self.font, prev) {
            (Some(font), Some(prev)) => font.horizontal_kern(prev, ch, px).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Pen positions of every character of `text`, plus the total width
    pub fn pen_positions(&self, text: &str, px: f32) -> (Vec<(char, f32)>, f32) {
        let mut pen = 0.0;
        let mut prev = None;
        let mut out = Vec::with_capacity(text.len());
        for ch in text.chars() {
            pen += self.kern(prev, ch, px);
            out.push((ch, pen));
            pen += self.advance(ch, px);
            prev = Some(ch);
        }
        (out, pen)
    }

    pub fn text_width(&self, text: &str, px: f32) -> f32 {
        self.pen_positions(text, px).1
    }

    pub fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.as_ref().and_then(|f| f.horizontal_line_metrics(px)) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: -m.descent,
            },
            None => LineMetrics {
                ascent: px * FALLBACK_ASCENT_EM,
                descent: px * FALLBACK_DESCENT_EM,
            },
        }
    }

    /// `None` for the fallback face and for glyphs with no ink
    pub fn rasterize(&self, ch: char, px: f32) -> Option<GlyphBitmap> {
        let font = self.font.as_ref()?;
        let (m, coverage) = font.rasterize(ch, px);
        if m.width == 0 || m.height == 0 {
            return None;
        }
        Some(GlyphBitmap {
            left: m.xmin,
            top: m.ymin + m.height as i32,
            width: m.width,
            height: m.height,
            coverage,
        })
    }
}

/// Font database plus a cache of faces already resolved from it
pub struct Fonts {
    db: Database,
    faces: Mutex<HashMap<(String, u16), FontFace>>,
}

impl Fonts {
    /// Every font installed on the system
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} system font faces", db.len());
        Self::with_database(db)
    }

    /// No installed faces; every lookup resolves to [`FontFace::fallback`]
    pub fn fallback() -> Self {
        Self::with_database(Database::new())
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            faces: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide system fonts, loaded on first use
    pub fn global() -> &'static Fonts {
        SYSTEM.get_or_init(|| {
            let fonts = Fonts::system();
            if fonts.db.is_empty() {
                log::warn!("no system fonts found, text will be drawn with fallback metrics");
            }
            fonts
        })
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Resolve a computed `font-family` list and numeric weight to a face
    pub fn face(&self, font_family: &str, weight: u16) -> FontFace {
        let key = (font_family.trim().to_ascii_lowercase(), weight);
        let mut faces = self.faces.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(face) = faces.get(&key) {
            return face.clone();
        }
        let face = self.load_face(&key.0, weight);
        faces.insert(key, face.clone());
        face
    }

    fn load_face(&self, font_family: &str, weight: u16) -> FontFace {
        if self.db.is_empty() {
            return FontFace::fallback();
        }
        let families = family_list(font_family);
        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let font = self.db.query(&query).and_then(|id| {
            self.db
                .with_face_data(id, |data, index| {
                    let settings = FontSettings {
                        collection_index: index,
                        ..FontSettings::default()
                    };
                    Font::from_bytes(data, settings)
                })
                .and_then(|parsed| match parsed {
                    Ok(font) => Some(font),
                    Err(e) => {
                        log::warn!("could not parse font for `{}`: {}", font_family, e);
                        None
                    }
                })
        });
        match font {
            Some(font) => FontFace {
                font: Some(Arc::new(font)),
            },
            None => {
                log::debug!("no installed face for `{}`, using fallback metrics", font_family);
                FontFace::fallback()
            }
        }
    }
}

/// Requested families in order, then installed families of the matching
/// generic family, then sans-serif ones
fn family_list(font_family: &str) -> Vec<Family<'_>> {
    let mut out = Vec::new();
    let mut generic = None;
    for name in font_family.split(',') {
        let name = name.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        match name {
            "" => {}
            "sans-serif" | "system-ui" => {
                out.push(Family::SansSerif);
                generic.get_or_insert(SANS_FALLBACKS);
            }
            "serif" => {
                out.push(Family::Serif);
                generic.get_or_insert(SERIF_FALLBACKS);
            }
            "monospace" => {
                out.push(Family::Monospace);
                generic.get_or_insert(MONO_FALLBACKS);
            }
            "cursive" => out.push(Family::Cursive),
            "fantasy" => out.push(Family::Fantasy),
            _ => out.push(Family::Name(name)),
        }
    }
    for fallback in [generic.unwrap_or(SANS_FALLBACKS), SANS_FALLBACKS] {
        out.extend(fallback.iter().map(|name| Family::Name(name)));
    }
    out
}

/// Numeric weight of a computed `font-weight`
pub fn weight_value(value: Option<&str>) -> u16 {
    match value.map(str::trim) {
        Some("bold") | Some("bolder") => 700,
        Some("lighter") => 300,
        Some(v) => v.parse::<f32>().map(|w| w.clamp(1.0, 1000.0) as u16).unwrap_or(400),
        None => 400,
    }
}
