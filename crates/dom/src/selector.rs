//! CSS selector subset used for ignore rules, selector replacements and
//! enrichment targets.
//!
//! Supported: type (`div`), universal (`*`), id (`#x`), class (`.x`),
//! attribute (`[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`,
//! `[a|=v]`, values bare or quoted), compounds of those, the descendant
//! (whitespace) and child (`>`) combinators, and comma-separated lists.
//! Pseudo-classes and sibling combinators are rejected at parse time.

use crate::document::Document;
use crate::types::NodeId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported selector syntax {found:?} at byte {at} in {input:?}")]
    Unsupported {
        input: String,
        at: usize,
        found: char,
    },
    #[error("unterminated {what} in {input:?}")]
    Unterminated { input: String, what: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
    DashMatch(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

impl AttrSelector {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(want) => value == want,
            AttrOp::Includes(want) => value.split_whitespace().any(|v| v == want),
            AttrOp::Prefix(want) => !want.is_empty() && value.starts_with(want.as_str()),
            AttrOp::Suffix(want) => !want.is_empty() && value.ends_with(want.as_str()),
            AttrOp::Substring(want) => !want.is_empty() && value.contains(want.as_str()),
            AttrOp::DashMatch(want) => {
                value == want
                    || value
                        .strip_prefix(want.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(name) = doc.element_name(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attributes
            .iter()
            .all(|a| a.matches(doc.attribute(node, &a.name)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    // combinators[i] joins compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_from(doc, node, self.compounds.len() - 1)
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
                .parent(node)
                .is_some_and(|p| self.matches_from(doc, p, idx - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .skip(1)
                .any(|a| self.matches_from(doc, a, idx - 1)),
        }
    }
}

/// Parsed, comma-separated selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        };
        let alternatives = parser.list()?;
        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node) && self.alternatives.iter().any(|c| c.matches(doc, node))
    }
}

impl Document {
    /// First element in document order matching `selector`.
    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&id| selector.matches(self, id))
    }

    /// Whether `node` or any of its ancestors matches `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors(node).find(|&a| selector.matches(self, a))
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unsupported(&self) -> SelectorError {
        let (at, found) = self
            .chars
            .get(self.pos)
            .copied()
            .unwrap_or((self.input.len(), '\0'));
        SelectorError::Unsupported {
            input: self.input.to_string(),
            at,
            found,
        }
    }

    fn list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            out.push(self.complex()?);
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                None => break,
                Some(_) => return Err(self.unsupported()),
            }
        }
        Ok(out)
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unsupported()),
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.required_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.required_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    let attribute = self.attribute()?;
                    compound.attributes.push(attribute);
                }
                _ => break,
            }
        }
        if compound.is_empty() && !universal {
            return Err(match self.peek() {
                None if self.input.trim().is_empty() => SelectorError::Empty,
                _ => self.unsupported(),
            });
        }
        Ok(compound)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(self.unsupported());
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.required_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op_char = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => None,
            Some(c @ ('~' | '^' | '$' | '*' | '|')) => {
                self.pos += 1;
                Some(c)
            }
            None => {
                return Err(SelectorError::Unterminated {
                    input: self.input.to_string(),
                    what: "attribute selector",
                });
            }
            Some(_) => return Err(self.unsupported()),
        };
        if self.bump() != Some('=') {
            return Err(self.unsupported());
        }
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => {
                            return Err(SelectorError::Unterminated {
                                input: self.input.to_string(),
                                what: "quoted value",
                            });
                        }
                    }
                }
                value
            }
            _ => self.required_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(SelectorError::Unterminated {
                input: self.input.to_string(),
                what: "attribute selector",
            });
        }
        let op = match op_char {
            None => AttrOp::Equals(value),
            Some('~') => AttrOp::Includes(value),
            Some('^') => AttrOp::Prefix(value),
            Some('$') => AttrOp::Suffix(value),
            Some('*') => AttrOp::Substring(value),
            Some(_) => AttrOp::DashMatch(value),
        };
        Ok(AttrSelector { name, op })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_html;

    fn first(doc: &Document, selector: &str) -> Option<NodeId> {
        doc.query_selector(&Selector::parse(selector).unwrap())
    }

    #[test]
    fn matches_type_id_class_and_compounds() {
        let doc = parse_html(
            r#"<div id="main" class="f4 my-3"><p class="note">x</p><code>y</code></div>"#,
        );
        let div = first(&doc, "div").unwrap();
        assert_eq!(first(&doc, "#main"), Some(div));
        assert_eq!(first(&doc, ".f4.my-3"), Some(div));
        assert_eq!(first(&doc, "div.my-3#main"), Some(div));
        assert_eq!(first(&doc, ".f4.my-4"), None);
        assert!(first(&doc, "CODE").is_some(), "type selectors are case-insensitive");
    }

    #[test]
    fn matches_attribute_operators() {
        let doc = parse_html(
            r#"<span itemprop="about" class="blob-code-inner" lang="zh-CN" data-x></span>"#,
        );
        let span = first(&doc, "span").unwrap();
        for sel in [
            "[data-x]",
            "[itemprop=about]",
            "[itemprop='about']",
            "[class*=blob-code]",
            "[class^=blob]",
            "[class$=inner]",
            "[class~=blob-code-inner]",
            "[lang|=zh]",
        ] {
            assert_eq!(first(&doc, sel), Some(span), "selector {sel} should match");
        }
        assert_eq!(first(&doc, "[class~=blob]"), None);
        assert_eq!(first(&doc, "[lang|=z]"), None);
    }

    #[test]
    fn matches_descendant_and_child_combinators() {
        let doc = parse_html(
            r#"<div class="gist-content"><section><p itemprop="about">d</p></section></div>"#,
        );
        let p = first(&doc, "p").unwrap();
        assert_eq!(first(&doc, ".gist-content [itemprop='about']"), Some(p));
        assert_eq!(first(&doc, ".gist-content > section > p"), Some(p));
        assert_eq!(first(&doc, ".gist-content > p"), None);
    }

    #[test]
    fn selector_list_matches_any_alternative() {
        let doc = parse_html("<pre>a</pre><kbd>b</kbd>");
        let sel = Selector::parse("code, kbd").unwrap();
        let kbd = doc.find_element("kbd").unwrap();
        let pre = doc.find_element("pre").unwrap();
        assert!(sel.matches(&doc, kbd));
        assert!(!sel.matches(&doc, pre));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert_eq!(Selector::parse("  "), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("a:hover"),
            Err(SelectorError::Unsupported { found: ':', .. })
        ));
        assert!(matches!(
            Selector::parse("h1 + p"),
            Err(SelectorError::Unsupported { found: '+', .. })
        ));
        assert!(matches!(
            Selector::parse("[a='x"),
            Err(SelectorError::Unterminated { .. })
        ));
    }

    #[test]
    fn closest_checks_self_then_ancestors() {
        let doc = parse_html(r#"<div class="js-ignore"><span><b>x</b></span></div>"#);
        let b = doc.find_element("b").unwrap();
        let div = doc.find_element("div").unwrap();
        let sel = Selector::parse(".js-ignore").unwrap();
        assert_eq!(doc.closest(b, &sel), Some(div));
        assert_eq!(doc.closest(b, &Selector::parse("table").unwrap()), None);
    }
}
