//! CSS color parsing for the rasterizer.
//!
//! Supports hex, `rgb()`/`rgba()`, `hsl()`/`hsla()`, `transparent` and the
//! common named colors. Modern color-space functions are recognised and
//! reported as [`ColorError::Unsupported`] so callers can tell "cannot paint
//! this" apart from plain garbage.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Serialize the way computed styles report colors
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            let alpha = (self.a as f32 / 255.0 * 100.0).round() / 100.0;
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// A color function this engine cannot paint (oklch, lab, ...)
    #[error("Attempting to parse an unsupported color function \"{0}\"")]
    Unsupported(String),
    #[error("Invalid color \"{0}\"")]
    Invalid(String),
}

const UNSUPPORTED_FUNCTIONS: &[&str] = &["oklch", "oklab", "lab", "lch", "color", "hwb", "color-mix"];

const NAMED: &[(&str, Rgba)] = &[
    ("black", Rgba::rgb(0, 0, 0)),
    ("white", Rgba::rgb(255, 255, 255)),
    ("red", Rgba::rgb(255, 0, 0)),
    ("green", Rgba::rgb(0, 128, 0)),
    ("lime", Rgba::rgb(0, 255, 0)),
    ("blue", Rgba::rgb(0, 0, 255)),
    ("yellow", Rgba::rgb(255, 255, 0)),
    ("orange", Rgba::rgb(255, 165, 0)),
    ("purple", Rgba::rgb(128, 0, 128)),
    ("navy", Rgba::rgb(0, 0, 128)),
    ("teal", Rgba::rgb(0, 128, 128)),
    ("maroon", Rgba::rgb(128, 0, 0)),
    ("olive", Rgba::rgb(128, 128, 0)),
    ("silver", Rgba::rgb(192, 192, 192)),
    ("gray", Rgba::rgb(128, 128, 128)),
    ("grey", Rgba::rgb(128, 128, 128)),
    ("lightgray", Rgba::rgb(211, 211, 211)),
    ("lightgrey", Rgba::rgb(211, 211, 211)),
    ("darkgray", Rgba::rgb(169, 169, 169)),
    ("darkgrey", Rgba::rgb(169, 169, 169)),
    ("aqua", Rgba::rgb(0, 255, 255)),
    ("cyan", Rgba::rgb(0, 255, 255)),
    ("fuchsia", Rgba::rgb(255, 0, 255)),
    ("magenta", Rgba::rgb(255, 0, 255)),
    ("pink", Rgba::rgb(255, 192, 203)),
    ("brown", Rgba::rgb(165, 42, 42)),
    ("whitesmoke", Rgba::rgb(245, 245, 245)),
];

pub fn parse_color(value: &str) -> Result<Rgba, ColorError> {
    let v = value.trim().to_ascii_lowercase();
    if v == "transparent" {
        return Ok(Rgba::TRANSPARENT);
    }
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| ColorError::Invalid(value.to_string()));
    }
    if let Some(open) = v.find('(') {
        let func = v[..open].trim();
        let args = v[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| ColorError::Invalid(value.to_string()))?;
        return match func {
            "rgb" | "rgba" => parse_rgb_args(args).ok_or_else(|| ColorError::Invalid(value.to_string())),
            "hsl" | "hsla" => parse_hsl_args(args).ok_or_else(|| ColorError::Invalid(value.to_string())),
            f if UNSUPPORTED_FUNCTIONS.contains(&f) => Err(ColorError::Unsupported(value.trim().to_string())),
            _ => Err(ColorError::Invalid(value.to_string())),
        };
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == v)
        .map(|(_, c)| *c)
        .ok_or_else(|| ColorError::Invalid(value.to_string()))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba { r: nibble(0)?, g: nibble(1)?, b: nibble(2)?, a: nibble(3)? }),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
        _ => None,
    }
}

/// Split `a, b, c` / `a b c / d` argument forms into components
fn components(args: &str) -> Vec<String> {
    args.replace('/', " ")
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn parse_alpha(s: &str) -> Option<u8> {
    let a = match s.strip_suffix('%') {
        Some(p) => p.parse::<f32>().ok()? / 100.0,
        None => s.parse::<f32>().ok()?,
    };
    Some((a.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn parse_channel(s: &str) -> Option<u8> {
    let v = match s.strip_suffix('%') {
        Some(p) => p.parse::<f32>().ok()? * 2.55,
        None => s.parse::<f32>().ok()?,
    };
    Some(v.clamp(0.0, 255.0).round() as u8)
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let c = components(args);
    if c.len() != 3 && c.len() != 4 {
        return None;
    }
    let a = match c.get(3) {
        Some(a) => parse_alpha(a)?,
        None => 255,
    };
    Some(Rgba {
        r: parse_channel(&c[0])?,
        g: parse_channel(&c[1])?,
        b: parse_channel(&c[2])?,
        a,
    })
}

fn parse_hsl_args(args: &str) -> Option<Rgba> {
    let c = components(args);
    if c.len() != 3 && c.len() != 4 {
        return None;
    }
    let h = c[0].trim_end_matches("deg").parse::<f32>().ok()?.rem_euclid(360.0) / 360.0;
    let s = c[1].strip_suffix('%')?.parse::<f32>().ok()?.clamp(0.0, 100.0) / 100.0;
    let l = c[2].strip_suffix('%')?.parse::<f32>().ok()?.clamp(0.0, 100.0) / 100.0;
    let a = match c.get(3) {
        Some(a) => parse_alpha(a)?,
        None => 255,
    };

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(Rgba {
        r: to_u8(hue(h + 1.0 / 3.0)),
        g: to_u8(hue(h)),
        b: to_u8(hue(h - 1.0 / 3.0)),
        a,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_color("#fff").unwrap(), Rgba::rgb(255, 255, 255));
        assert_eq!(parse_color("#102030").unwrap(), Rgba::rgb(16, 32, 48));
        assert_eq!(parse_color("rgb(1, 2, 3)").unwrap(), Rgba::rgb(1, 2, 3));
        assert_eq!(parse_color("rgba(1 2 3 / 0)").unwrap().a, 0);
        assert_eq!(parse_color("Navy").unwrap(), Rgba::rgb(0, 0, 128));
        assert_eq!(parse_color("hsl(0, 100%, 50%)").unwrap(), Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn modern_color_spaces_are_unsupported() {
        match parse_color("oklch(0.5 0.1 200)") {
            Err(ColorError::Unsupported(v)) => assert_eq!(v, "oklch(0.5 0.1 200)"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_color("lab(50% 40 59)"), Err(ColorError::Unsupported(_))));
        assert!(matches!(parse_color("#12345"), Err(ColorError::Invalid(_))));
    }

    #[test]
    fn errors_describe_the_offending_value() {
        let err = parse_color("oklch(0.5 0.1 200)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attempting to parse an unsupported color function \"oklch(0.5 0.1 200)\""
        );
        let boxed: Box<dyn std::error::Error> = Box::new(parse_color("nope").unwrap_err());
        assert_eq!(boxed.to_string(), "Invalid color \"nope\"");
    }

    #[test]
    fn serializes_like_computed_style() {
        assert_eq!(Rgba::rgb(0, 0, 0).to_css(), "rgb(0, 0, 0)");
        assert_eq!(Rgba::TRANSPARENT.to_css(), "rgba(0, 0, 0, 0)");
    }
}
