//! Small HTML tokenizer and tree builder for fixtures and offline pages.
//!
//! Scope is practical, not HTML5-complete:
//! - Tag and attribute names are ASCII `[A-Za-z0-9:_-]`, canonicalised to
//!   lowercase.
//! - `script`/`style` bodies are raw text; `title`/`textarea` bodies are raw
//!   text with character references decoded.
//! - Void elements never take children; `<x/>` self-closes any element.
//! - An end tag closes the nearest open element of the same name; an end
//!   tag with no open match is dropped.
//! - No implied end tags and no foster parenting.

use crate::document::Document;
use crate::entities::decode_entities;
use crate::types::{Attribute, NodeId};
use memchr::memchr;
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "title" | "textarea")
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

/// Parse `input` into a fresh, unobserved document.
pub fn parse_html(input: &str) -> Document {
    let mut builder = TreeBuilder::new();
    for token in tokenize(input) {
        builder.push(token);
    }
    builder.doc
}

struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.doc.root())
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        // The builder only ever appends fresh nodes under open containers.
        if let Err(err) = self.doc.append_child(parent, node) {
            debug_assert!(false, "tree builder append failed: {err}");
        }
    }

    fn push(&mut self, token: Token) {
        match token {
            Token::Doctype(doctype) => self.doc.set_doctype(doctype),
            Token::Comment(text) => {
                let node = self.doc.create_comment(&text);
                self.append(node);
            }
            Token::Text(text) => {
                if !text.is_empty() {
                    let node = self.doc.create_text(&text);
                    self.append(node);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let node = self.doc.create_element(&name, attributes);
                self.append(node);
                if !self_closing && !is_void_element(&name) {
                    self.open.push(node);
                }
            }
            Token::EndTag(name) => {
                let Some(pos) = self
                    .open
                    .iter()
                    .rposition(|&id| self.doc.is_element_named(id, &name))
                else {
                    log::trace!(target: "dom.parse", "dropping unmatched end tag </{name}>");
                    return;
                };
                self.open.truncate(pos);
            }
        }
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut i = 0;

    // Slice endpoints are only ever taken at ASCII structural bytes, so they
    // stay on UTF-8 boundaries.
    while i < len {
        if bytes[i] != b'<' {
            let end = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            out.push(Token::Text(decode_entities(&input[i..end])));
            i = end;
            continue;
        }

        let rest = &input[i..];
        if let Some(body) = rest.strip_prefix("<!--") {
            match body.find("-->") {
                Some(end) => {
                    out.push(Token::Comment(body[..end].to_string()));
                    i += 4 + end + 3;
                }
                None => {
                    out.push(Token::Comment(body.to_string()));
                    i = len;
                }
            }
            continue;
        }
        if rest.len() >= 9 && rest.as_bytes()[..9].eq_ignore_ascii_case(b"<!doctype") {
            let Some(end) = rest.find('>') else {
                break;
            };
            out.push(Token::Doctype(rest[9..end].trim().to_string()));
            i += end + 1;
            continue;
        }

        if bytes.get(i + 1) == Some(&b'/') {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            j = memchr(b'>', &bytes[j..]).map_or(len, |rel| j + rel + 1);
            if !name.is_empty() {
                out.push(Token::EndTag(name));
            }
            i = j;
            continue;
        }

        let start = i + 1;
        let mut j = start;
        while j < len && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == start {
            // A bare '<' is text.
            out.push(Token::Text("<".to_string()));
            i += 1;
            continue;
        }
        let name = input[start..j].to_ascii_lowercase();
        let (attributes, self_closing, after) = read_attributes(input, j);
        i = after;

        let raw = is_raw_text_element(&name) && !self_closing;
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        if raw {
            let (body, resume) = read_raw_text(input, i, &name);
            if !body.is_empty() {
                let text = if name == "title" || name == "textarea" {
                    decode_entities(body)
                } else {
                    body.to_string()
                };
                out.push(Token::Text(text));
            }
            out.push(Token::EndTag(name));
            i = resume;
        }
    }
    out
}

/// Read attributes starting at byte `k` (just past the tag name). Returns
/// the attributes, the self-closing flag, and the byte after `>`.
fn read_attributes(input: &str, mut k: usize) -> (Vec<Attribute>, bool, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len {
            break;
        }
        match bytes[k] {
            b'>' => {
                k += 1;
                break;
            }
            b'/' if bytes.get(k + 1) == Some(&b'>') => {
                self_closing = true;
                k += 2;
                break;
            }
            b'/' => {
                k += 1;
                continue;
            }
            _ => {}
        }

        let name_start = k;
        while k < len && is_name_byte(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let name: Arc<str> = Arc::from(input[name_start..k].to_ascii_lowercase());
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if bytes.get(k) != Some(&b'=') {
            attributes.push((name, None));
            continue;
        }
        k += 1;
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        let value = match bytes.get(k).copied() {
            Some(quote) if quote == b'"' || quote == b'\'' => {
                let vstart = k + 1;
                let vend = memchr(quote, &bytes[vstart..]).map_or(len, |rel| vstart + rel);
                k = (vend + 1).min(len);
                decode_entities(&input[vstart..vend])
            }
            _ => {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    if bytes[k] == b'/' && bytes.get(k + 1) == Some(&b'>') {
                        break;
                    }
                    k += 1;
                }
                decode_entities(&input[vstart..k])
            }
        };
        attributes.push((name, Some(value)));
    }
    (attributes, self_closing, k)
}

/// Body of a raw-text element and the byte after its close tag. A missing
/// close tag consumes the rest of the input.
fn read_raw_text<'a>(input: &'a str, start: usize, name: &str) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let mut i = start;
    while let Some(rel) = memchr(b'<', &bytes[i..]) {
        let lt = i + rel;
        let tag_end = lt + 2 + name.len();
        if bytes.get(lt + 1) == Some(&b'/')
            && bytes
                .get(lt + 2..tag_end)
                .is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()))
        {
            let mut k = tag_end;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return (&input[start..lt], k + 1);
            }
        }
        i = lt + 1;
    }
    (&input[start..], bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeData;

    #[test]
    fn tokenize_reads_quoted_unquoted_and_bare_attributes() {
        let tokens = tokenize(r#"<input type=submit value="Sign &amp; go" disabled/>"#);
        let [Token::StartTag {
            name,
            attributes,
            self_closing,
        }] = tokens.as_slice()
        else {
            panic!("expected one start tag, got: {tokens:?}");
        };
        assert_eq!(name, "input");
        assert!(*self_closing);
        let expected: Vec<Attribute> = vec![
            (Arc::from("type"), Some("submit".to_string())),
            (Arc::from("value"), Some("Sign & go".to_string())),
            (Arc::from("disabled"), None),
        ];
        assert_eq!(attributes, &expected);
    }

    #[test]
    fn tokenize_keeps_script_body_raw() {
        let tokens = tokenize("<script>if (a < b) { x = '<p>'; }</SCRIPT >after");
        assert_eq!(
            tokens,
            vec![
                Token::StartTag {
                    name: "script".into(),
                    attributes: Vec::new(),
                    self_closing: false
                },
                Token::Text("if (a < b) { x = '<p>'; }".into()),
                Token::EndTag("script".into()),
                Token::Text("after".into()),
            ]
        );
    }

    #[test]
    fn tokenize_preserves_utf8_text() {
        let tokens = tokenize("<p>设置 · Settings</p>");
        assert!(
            tokens
                .iter()
                .any(|t| matches!(t, Token::Text(s) if s == "设置 · Settings")),
            "expected UTF-8 text token, got: {tokens:?}"
        );
    }

    #[test]
    fn builder_nests_and_closes_elements() {
        let doc = parse_html("<!DOCTYPE html><html><body><div><p>a<br>b</p></div></body></html>");
        assert_eq!(doc.doctype(), Some("html"));
        let p = doc.find_element("p").unwrap();
        let kids: Vec<_> = doc
            .children(p)
            .iter()
            .map(|&c| doc.data(c).cloned().unwrap())
            .collect();
        assert_eq!(kids.len(), 3, "br must not swallow trailing text: {kids:?}");
        assert!(matches!(&kids[2], NodeData::Text { text } if text == "b"));
    }

    #[test]
    fn builder_drops_unmatched_end_tags() {
        let doc = parse_html("<div>a</span>b</div>");
        let div = doc.find_element("div").unwrap();
        assert_eq!(doc.text_content(div), "ab");
        assert_eq!(doc.children(div).len(), 2);
    }

    #[test]
    fn builder_reads_title_with_references() {
        let doc = parse_html("<head><title>Issues &middot; octo/repo</title></head>");
        assert_eq!(doc.title(), "Issues · octo/repo");
    }
}
