//! Replacement templates in dictionary notation.
//!
//! Dictionary files write replacements the way page scripts do: `$1`..`$99`
//! for capture groups, `$&` for the whole match and `$$` for a literal
//! dollar. A `$n` naming a group the pattern does not have stays literal.

use regex::Captures;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Text(String),
    Group(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    /// Parse `source` for a pattern with `groups` capture groups.
    pub fn parse(source: &str, groups: usize) -> Self {
        let bytes = source.as_bytes();
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut lit_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'$' {
                i += 1;
                continue;
            }
            let next = bytes.get(i + 1).copied();
            if next == Some(b'$') {
                // Keep one of the two dollars.
                literal.push_str(&source[lit_start..i + 1]);
                i += 2;
                lit_start = i;
                continue;
            }
            let group = match next {
                Some(b'&') => Some((0, 2)),
                Some(d) if d.is_ascii_digit() => {
                    let one = usize::from(d - b'0');
                    let two = bytes
                        .get(i + 2)
                        .filter(|b| b.is_ascii_digit())
                        .map(|b| one * 10 + usize::from(*b - b'0'));
                    match two {
                        Some(n) if (1..=groups).contains(&n) => Some((n, 3)),
                        _ if (1..=groups).contains(&one) => Some((one, 2)),
                        _ => None,
                    }
                }
                _ => None,
            };
            let Some((index, width)) = group else {
                i += 1;
                continue;
            };
            literal.push_str(&source[lit_start..i]);
            if !literal.is_empty() {
                pieces.push(Piece::Text(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Group(index));
            i += width;
            lit_start = i;
        }
        literal.push_str(&source[lit_start..]);
        if !literal.is_empty() {
            pieces.push(Piece::Text(literal));
        }
        Self { pieces }
    }

    /// A group that did not participate expands to nothing.
    pub fn expand(&self, caps: &Captures<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Group(index) => {
                    out.push_str(caps.get(*index).map_or("", |m| m.as_str()));
                }
            }
        }
        out
    }
}

pub type ComputeFn = Arc<dyn Fn(&Captures<'_>) -> String + Send + Sync>;

/// What a regex rule produces for one match.
#[derive(Clone)]
pub enum Replacement {
    Template(Template),
    /// Built-in rules that need arithmetic or table lookups on the groups.
    Computed(ComputeFn),
}

impl Replacement {
    pub fn expand(&self, caps: &Captures<'_>) -> String {
        match self {
            Replacement::Template(template) => template.expand(caps),
            Replacement::Computed(compute) => compute(caps),
        }
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Replacement::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
