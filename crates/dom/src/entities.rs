//! Character references for the fixture parser and the serializer.
//!
//! Decoding is deliberately narrow: the named references in `NAMED`, plus
//! semicolon-terminated decimal/hex numerics that form a valid scalar.
//! Anything else is copied through unchanged.

use memchr::memchr;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("middot", '·'),
    ("hellip", '…'),
];

// Longest accepted reference body, `#x10FFFF`.
const MAX_REFERENCE_LEN: usize = 8;

pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_start = 0;
    let mut i = 0;

    while let Some(rel) = memchr(b'&', &bytes[i..]) {
        let amp = i + rel;
        out.push_str(&s[copy_start..amp]);
        copy_start = amp;
        i = amp + 1;

        let window_end = (amp + 2 + MAX_REFERENCE_LEN).min(bytes.len());
        let Some(semi) = memchr(b';', &bytes[amp + 1..window_end]) else {
            continue;
        };
        let body = &s[amp + 1..amp + 1 + semi];
        if let Some(ch) = decode_reference(body) {
            out.push(ch);
            i = amp + 1 + semi + 1;
            copy_start = i;
        }
    }
    out.push_str(&s[copy_start..]);
    out
}

fn decode_reference(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (num, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32);
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == body)
        .map(|&(_, ch)| ch)
}

pub(crate) fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn escape_attribute(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("Mar&nbsp;19"), "Mar\u{00A0}19");
        assert_eq!(decode_entities("&#35;1 &#x1F44D;"), "#1 👍");
    }

    #[test]
    fn passes_through_unknown_and_malformed_references() {
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&bogus; &amp"), "&bogus; &amp");
        assert_eq!(decode_entities("&#xD800; &#;"), "&#xD800; &#;");
        assert_eq!(decode_entities("&&amp;"), "&&");
    }

    #[test]
    fn escapes_for_text_and_attributes() {
        let mut out = String::new();
        escape_text("1 < 2 & \"q\"", &mut out);
        assert_eq!(out, "1 &lt; 2 &amp; \"q\"");

        let mut out = String::new();
        escape_attribute("say \"hi\" & <go>", &mut out);
        assert_eq!(out, "say &quot;hi&quot; &amp; <go>");
    }
}
