//! Minimal selector engine: type, `#id`, `.class` and `*` compounds joined by
//! descendant or child combinators, in comma-separated lists.

use crate::dom::{Document, NodeId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimpleSelector {
    Type(String),
    Id(String),
    Class(String),
    Universal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct Specificity(pub u32);

impl Specificity {
    pub fn from_counts(a: u32, b: u32, c: u32) -> Self {
        Specificity((a << 20) | (b << 10) | c)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ComplexSelector {
    /// Left-to-right compounds; `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
    pub specificity: Specificity,
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Parse a selector list; `None` if any part uses unsupported syntax
    pub fn parse(text: &str) -> Option<Self> {
        let selectors = text
            .split(',')
            .map(ComplexSelector::parse)
            .collect::<Option<Vec<_>>>()?;
        if selectors.is_empty() {
            return None;
        }
        Some(Self { selectors })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }

    /// Highest specificity among the selectors matching `node`
    pub fn matching_specificity(&self, doc: &Document, node: NodeId) -> Option<Specificity> {
        self.selectors
            .iter()
            .filter(|s| s.matches(doc, node))
            .map(|s| s.specificity)
            .max()
    }
}

impl ComplexSelector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pending: Option<Combinator> = None;

        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                if !compounds.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
                i += 1;
                continue;
            }
            if c == '>' {
                if compounds.is_empty() {
                    return None;
                }
                pending = Some(Combinator::Child);
                i += 1;
                continue;
            }
            let (compound, next) = parse_compound(&chars, i)?;
            if !compounds.is_empty() {
                combinators.push(pending.take()?);
            }
            pending = None;
            compounds.push(compound);
            i = next;
        }
        if compounds.is_empty() || matches!(pending, Some(Combinator::Child)) {
            return None;
        }

        let (mut a, mut b, mut c) = (0, 0, 0);
        for s in compounds.iter().flat_map(|cs| cs.simples.iter()) {
            match s {
                SimpleSelector::Id(_) => a += 1,
                SimpleSelector::Class(_) => b += 1,
                SimpleSelector::Type(_) => c += 1,
                SimpleSelector::Universal => {}
            }
        }
        Some(Self {
            compounds,
            combinators,
            specificity: Specificity::from_counts(a, b, c),
        })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        self.matches_from(doc, node, last)
    }

    fn matches_from(&self, doc: &Document, node: NodeId, idx: usize) -> bool {
        if !self.compounds[idx].matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .map(|p| self.matches_from(doc, p, idx - 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut cur = doc.parent_element(node);
                while let Some(p) = cur {
                    if self.matches_from(doc, p, idx - 1) {
                        return true;
                    }
                    cur = doc.parent_element(p);
                }
                false
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(chars: &[char], mut i: usize) -> Option<(CompoundSelector, usize)> {
    let mut simples = Vec::new();
    let read_ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => {
                simples.push(SimpleSelector::Universal);
                i += 1;
            }
            '#' | '.' => {
                let (ident, end) = read_ident(i + 1);
                if ident.is_empty() {
                    return None;
                }
                simples.push(if c == '#' {
                    SimpleSelector::Id(ident)
                } else {
                    SimpleSelector::Class(ident)
                });
                i = end;
            }
            c if is_ident_char(c) => {
                let (ident, end) = read_ident(i);
                simples.push(SimpleSelector::Type(ident.to_ascii_lowercase()));
                i = end;
            }
            c if c.is_whitespace() || c == '>' => break,
            // pseudo-classes, attribute selectors, sibling combinators
            _ => return None,
        }
    }
    if simples.is_empty() {
        None
    } else {
        Some((CompoundSelector { simples }, i))
    }
}

impl CompoundSelector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        self.simples.iter().all(|s| match s {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(t) => el.name == *t,
            SimpleSelector::Id(id) => el.id() == Some(id.as_str()),
            SimpleSelector::Class(c) => el.has_class(c),
        })
    }
}
