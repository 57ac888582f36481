//! Markup serialization (`outerHTML` / `innerHTML`).
//!
//! Shadow trees are not part of markup. Output is deterministic so that two trees
//! with equal structure serialize to identical strings.
use crate::json::with_stack;
use crate::markup::{is_raw_text_element, is_void_element};
use crate::types::{Document, NodeId, NodeKind};

impl Document {
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        write_node(self, node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(node).is_some_and(is_raw_text_element);
        for &child in self.children(node) {
            write_child(self, child, raw, &mut out);
        }
        out
    }

    /// Serialization of the whole document, doctype included.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if let Some(doctype) = self.doctype() {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
        for &child in self.children(self.root()) {
            write_node(self, child, &mut out);
        }
        out
    }
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    with_stack(|| write_node_level(doc, node, out))
}

fn write_node_level(doc: &Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Document { .. }) => out.push_str(&doc.to_html()),
        Some(NodeKind::Element {
            name, attributes, ..
        }) => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let raw = is_raw_text_element(name);
            for &child in doc.children(node) {
                write_child(doc, child, raw, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeKind::Text { text }) => escape_text(text, out),
        Some(NodeKind::Comment { text }) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeKind::ShadowRoot { .. }) => {
            for &child in doc.children(node) {
                write_node(doc, child, out);
            }
        }
        None => {}
    }
}

fn write_child(doc: &Document, child: NodeId, raw_parent: bool, out: &mut String) {
    match doc.kind(child) {
        Some(NodeKind::Text { text }) if raw_parent => out.push_str(text),
        _ => write_node(doc, child, out),
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}
