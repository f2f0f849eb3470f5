//! Style system: stylesheet parsing, selector matching, cascade and the
//! computed-style projection used by the normalizer, sanitizer and layout.

pub mod color;
pub mod computed;
pub mod css;
pub mod selector;

pub use computed::{computed_style, Cascade, StyleResolver, PROPERTIES};

/// Resolved `(property, value)` pairs of one element, in property-table order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSnapshot {
    entries: Vec<(String, String)>,
}

impl StyleSnapshot {
    pub(crate) fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Flatten to an inline style string, skipping entries `keep` rejects
    pub fn to_css_text<F>(&self, mut keep: F) -> String
    where
        F: FnMut(&str, &str) -> bool,
    {
        let mut css = String::new();
        for (prop, val) in self.iter() {
            if !keep(prop, val) {
                continue;
            }
            css.push_str(prop);
            css.push(':');
            css.push_str(val);
            css.push(';');
        }
        css
    }
}
