use crate::document::Document;
use crate::entities::{escape_attribute, escape_text};
use crate::parse::is_void_element;
use crate::types::{NodeData, NodeId};

/// Serialize the subtree at `id` back to HTML.
pub fn to_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(data) = doc.data(id) else {
        return;
    };
    match data {
        NodeData::Document { doctype } => {
            if let Some(dt) = doctype {
                out.push_str("<!DOCTYPE ");
                out.push_str(dt);
                out.push('>');
            }
            for &c in doc.children(id) {
                write_node(doc, c, out);
            }
        }
        NodeData::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for (k, v) in attributes {
                out.push(' ');
                out.push_str(k);
                if let Some(v) = v {
                    out.push_str("=\"");
                    escape_attribute(v, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let raw = matches!(&**name, "script" | "style");
            for &c in doc.children(id) {
                match doc.data(c) {
                    Some(NodeData::Text { text }) if raw => out.push_str(text),
                    _ => write_node(doc, c, out),
                }
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text { text } => escape_text(text, out),
        NodeData::Comment { text } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

/// Indented one-line-per-node outline, capped at `cap` lines.
pub fn outline(doc: &Document, cap: usize) -> Vec<String> {
    fn clip(text: &str) -> String {
        let t = text.replace('\n', " ");
        let t = t.trim();
        if t.chars().count() > 40 {
            let head: String = t.chars().take(40).collect();
            format!("{head}…")
        } else {
            t.to_string()
        }
    }

    fn walk(doc: &Document, id: NodeId, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        let indent = "  ".repeat(depth);
        let line = match doc.data(id) {
            Some(NodeData::Document { .. }) => Some(format!("{indent}#document")),
            Some(NodeData::Element { name, .. }) => {
                let mut line = format!("{indent}<{name}");
                for key in ["id", "class"] {
                    if let Some(v) = doc.attribute(id, key).filter(|v| !v.is_empty()) {
                        line.push_str(&format!(r#" {key}="{v}""#));
                    }
                }
                line.push('>');
                Some(line)
            }
            Some(NodeData::Text { text }) => {
                let show = clip(text);
                (!show.is_empty()).then(|| format!("{indent}\"{show}\""))
            }
            Some(NodeData::Comment { text }) => Some(format!("{indent}<!-- {} -->", clip(text))),
            None => None,
        };
        if let Some(line) = line {
            *left -= 1;
            out.push(line);
        }
        for &c in doc.children(id) {
            walk(doc, c, depth + 1, out, left);
        }
    }

    let mut out = Vec::new();
    let mut left = cap;
    walk(doc, doc.root(), 0, &mut out, &mut left);
    out
}
