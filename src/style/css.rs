//! Stylesheet and declaration-block parsing on top of `cssparser`.
//!
//! Shorthands the computed-style table knows about (`margin`, `padding`,
//! `border`, `background`) are expanded into longhands at parse time.
//! Rules whose selector cannot be parsed are dropped, as browsers do.

use super::selector::SelectorList;
use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};

/// Where a rule came from; later origins win at equal importance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    UserAgent,
    Author,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Ordered list of declarations, as found in a `style` attribute or rule body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationBlock {
    declarations: Vec<Declaration>,
}

impl DeclarationBlock {
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Self::from_body(&mut parser)
    }

    fn from_body(body: &mut Parser) -> Self {
        let mut block = DeclarationBlock::default();
        let mut decls = BodyDeclParser;
        for expanded in RuleBodyParser::new(body, &mut decls).flatten() {
            for decl in expanded {
                block.push(decl);
            }
        }
        block
    }

    fn push(&mut self, decl: Declaration) {
        self.declarations.retain(|d| d.name != decl.name);
        self.declarations.push(decl);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    /// Set a property (normal importance), expanding shorthands
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.trim().to_ascii_lowercase();
        for (n, v) in expand_shorthand(&name, value.trim()) {
            match self.declarations.iter_mut().find(|d| d.name == n) {
                Some(d) => {
                    d.value = v;
                    d.important = false;
                }
                None => self.declarations.push(Declaration {
                    name: n,
                    value: v,
                    important: false,
                }),
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.declarations.iter().position(|d| d.name == name)?;
        Some(self.declarations.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize as `name:value;` pairs
    pub fn to_css_text(&self) -> String {
        let mut out = String::new();
        for d in &self.declarations {
            out.push_str(&d.name);
            out.push(':');
            out.push_str(&d.value);
            if d.important {
                out.push_str(" !important");
            }
            out.push(';');
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: SelectorList,
    pub declarations: DeclarationBlock,
    /// Position in the cascade, unique across all sheets of one cascade
    pub order: u32,
}

#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub origin: Origin,
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Parse `css`, numbering rules from `base_order`. Returns the sheet and the
    /// next free order.
    pub fn parse(css: &str, origin: Origin, base_order: u32) -> (Self, u32) {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut top = TopLevelParser;
        let mut rules = Vec::new();
        let mut order = base_order;

        for (prelude, declarations) in StyleSheetParser::new(&mut parser, &mut top).flatten() {
            match SelectorList::parse(&prelude) {
                Some(selectors) => {
                    rules.push(Rule {
                        selectors,
                        declarations,
                        order,
                    });
                    order += 1;
                }
                None => log::debug!("skipping rule with unsupported selector `{}`", prelude),
            }
        }

        (Stylesheet { origin, rules }, order)
    }
}

/// `(value, important)` with a trailing `!important` removed
fn split_important(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if let Some(pos) = trimmed.to_ascii_lowercase().rfind("!important") {
        if trimmed[pos + "!important".len()..].trim().is_empty() {
            return (trimmed[..pos].trim_end().to_string(), true);
        }
    }
    (trimmed.to_string(), false)
}

/// Rule bodies and `style` attributes. Each declaration comes back already
/// expanded into longhands.
struct BodyDeclParser;

impl<'i> DeclarationParser<'i> for BodyDeclParser {
    type Declaration = Vec<Declaration>;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let (value, important) = split_important(input.slice_from(start));
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        let name = name.to_ascii_lowercase();
        Ok(expand_shorthand(&name, &value)
            .into_iter()
            .map(|(name, value)| Declaration {
                name,
                value,
                important,
            })
            .collect())
    }
}

impl<'i> AtRuleParser<'i> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Vec<Declaration>;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Vec<Declaration>;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Vec<Declaration>, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Qualified rules become `(prelude, body)`; at-rules are skipped whole
struct TopLevelParser;

impl<'i> AtRuleParser<'i> for TopLevelParser {
    type Prelude = ();
    type AtRule = (String, DeclarationBlock);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for TopLevelParser {
    type Prelude = String;
    type QualifiedRule = (String, DeclarationBlock);
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(input.slice_from(start).trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Ok((prelude, DeclarationBlock::from_body(input)))
    }
}

fn consume_block<'i>(block: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while block.next().is_ok() {}
    Ok(())
}

/// Top-level component values of `value`; functions and blocks stay whole
fn value_tokens(value: &str) -> Vec<&str> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut tokens = Vec::new();
    loop {
        parser.skip_whitespace();
        let start = parser.position();
        let nested = match parser.next() {
            Ok(Token::Function(_))
            | Ok(Token::ParenthesisBlock)
            | Ok(Token::SquareBracketBlock)
            | Ok(Token::CurlyBracketBlock) => true,
            Ok(_) => false,
            Err(_) => break,
        };
        if nested {
            let _ = parser.parse_nested_block(consume_block);
        }
        tokens.push(parser.slice_from(start));
    }
    tokens
}

fn expand_sides(prefix: &str, value: &str) -> Vec<(String, String)> {
    let t = value_tokens(value);
    let (top, right, bottom, left) = match t.as_slice() {
        [a] => (*a, *a, *a, *a),
        [a, b] => (*a, *b, *a, *b),
        [a, b, c] => (*a, *b, *c, *b),
        [a, b, c, d, ..] => (*a, *b, *c, *d),
        [] => return Vec::new(),
    };
    vec![
        (format!("{prefix}-top"), top.to_string()),
        (format!("{prefix}-right"), right.to_string()),
        (format!("{prefix}-bottom"), bottom.to_string()),
        (format!("{prefix}-left"), left.to_string()),
    ]
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

fn looks_like_length(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    matches!(t.as_str(), "thin" | "medium" | "thick")
        || t.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

fn expand_shorthand(name: &str, value: &str) -> Vec<(String, String)> {
    match name {
        "margin" | "padding" => expand_sides(name, value),
        "border" => {
            let mut width = None;
            let mut style = None;
            let mut color = None;
            for tok in value_tokens(value) {
                let lower = tok.to_ascii_lowercase();
                if BORDER_STYLES.contains(&lower.as_str()) {
                    style = Some(lower);
                } else if looks_like_length(tok) {
                    width = Some(tok.to_string());
                } else {
                    color = Some(tok.to_string());
                }
            }
            vec![
                ("border-width".into(), width.unwrap_or_else(|| "medium".into())),
                ("border-style".into(), style.unwrap_or_else(|| "none".into())),
                ("border-color".into(), color.unwrap_or_else(|| "currentcolor".into())),
            ]
        }
        "background" => {
            let lower = value.to_ascii_lowercase();
            if lower.contains("url(") || lower.contains("gradient(") {
                vec![("background-image".into(), value.to_string())]
            } else if lower == "none" {
                vec![("background-image".into(), "none".into())]
            } else {
                vec![("background-color".into(), value.to_string())]
            }
        }
        _ => vec![(name.to_string(), value.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_handle_important_and_parens() {
        let block = DeclarationBlock::parse(
            "color: rgb(1, 2, 3) !important; background: url(data:image/png;base64,AAA=); ; bogus",
        );
        let color = block.iter().find(|d| d.name == "color").unwrap();
        assert!(color.important);
        assert_eq!(color.value, "rgb(1, 2, 3)");
        assert_eq!(block.get("background-image"), Some("url(data:image/png;base64,AAA=)"));
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn shorthands_expand_to_longhands() {
        let block = DeclarationBlock::parse("margin: 1px 2px; border: 2px solid oklch(0.5 0.1 200)");
        assert_eq!(block.get("margin-top"), Some("1px"));
        assert_eq!(block.get("margin-left"), Some("2px"));
        assert_eq!(block.get("border-width"), Some("2px"));
        assert_eq!(block.get("border-style"), Some("solid"));
        assert_eq!(block.get("border-color"), Some("oklch(0.5 0.1 200)"));
    }

    #[test]
    fn stylesheet_skips_comments_at_rules_and_bad_selectors() {
        let css = "/* c */ @import url(x.css); @media print { p { color: red } }\n\
                   p { color: blue } a:hover { color: green } .x > .y { margin: 0 }";
        let (sheet, next) = Stylesheet::parse(css, Origin::Author, 10);
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].order, 10);
        assert_eq!(next, 12);
    }

    #[test]
    fn comment_markers_inside_strings_are_not_comments() {
        let css = ".a { content: \"/*\"; color: red } .b { color: blue }";
        let (sheet, _) = Stylesheet::parse(css, Origin::Author, 0);
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].declarations.get("content"), Some("\"/*\""));
        assert_eq!(sheet.rules[1].declarations.get("color"), Some("blue"));
    }

    #[test]
    fn escaped_separators_stay_in_the_value() {
        let block = DeclarationBlock::parse("font-family: a\\;b; color: red");
        assert_eq!(block.get("font-family"), Some("a\\;b"));
        assert_eq!(block.get("color"), Some("red"));
    }

    #[test]
    fn uppercase_important_is_recognised() {
        let block = DeclarationBlock::parse("COLOR: red !IMPORTANT");
        let color = block.iter().next().unwrap();
        assert_eq!(color.name, "color");
        assert_eq!(color.value, "red");
        assert!(color.important);
    }

    #[test]
    fn css_text_uses_compact_pairs() {
        let mut block = DeclarationBlock::default();
        block.set("color", "red");
        block.set("opacity", "0");
        assert_eq!(block.to_css_text(), "color:red;opacity:0;");
    }
}
