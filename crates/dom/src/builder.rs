//! Tree construction from markup tokens.
//!
//! The builder keeps a stack of open elements and closes them on a matching end
//! tag; unmatched end tags are ignored. Documents keep at most one element child:
//! later top-level content is appended to the document element.
use crate::markup::{Token, is_void_element, tokenize};
use crate::types::{Document, NodeId};

impl Document {
    pub fn parse(markup: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let mut stack: Vec<NodeId> = Vec::new();
        for token in tokenize(markup) {
            let parent = match stack.last() {
                Some(&open) => open,
                None => match token {
                    Token::Doctype(name) => {
                        if doc.document_element().is_none() {
                            doc.set_doctype(Some(name));
                        }
                        continue;
                    }
                    Token::Comment(text) => {
                        let comment = doc.create_comment(text);
                        append_or_log(&mut doc, root, comment);
                        continue;
                    }
                    Token::Text(ref text) if text.trim().is_empty() => continue,
                    _ => match doc.document_element() {
                        Some(html) => html,
                        None => root,
                    },
                },
            };
            if parent == root && matches!(token, Token::Text(_)) {
                log::trace!(target: "mirror.markup", "dropping text before the document element");
                continue;
            }
            push_token(&mut doc, &mut stack, parent, token);
        }
        doc
    }
}

/// Parses `markup` into detached nodes owned by `doc`, in document order.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let mut top_level = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    for token in tokenize(markup) {
        match stack.last().copied() {
            Some(parent) => push_token(doc, &mut stack, parent, token),
            None => {
                if let Some(node) = create_for_token(doc, &token) {
                    top_level.push(node);
                    if opens_element(doc, node, &token) {
                        stack.push(node);
                    }
                }
            }
        }
    }
    top_level
}

fn push_token(doc: &mut Document, stack: &mut Vec<NodeId>, parent: NodeId, token: Token) {
    if let Token::EndTag(name) = &token {
        if let Some(position) = stack
            .iter()
            .rposition(|&open| doc.tag_name(open) == Some(name.as_str()))
        {
            stack.truncate(position);
        }
        return;
    }
    let Some(node) = create_for_token(doc, &token) else {
        return;
    };
    if !append_or_log(doc, parent, node) {
        return;
    }
    if opens_element(doc, node, &token) {
        stack.push(node);
    }
}

fn opens_element(doc: &Document, node: NodeId, token: &Token) -> bool {
    match token {
        Token::StartTag { self_closing, .. } => {
            !self_closing && !doc.tag_name(node).is_some_and(is_void_element)
        }
        _ => false,
    }
}

fn create_for_token(doc: &mut Document, token: &Token) -> Option<NodeId> {
    match token {
        Token::StartTag {
            name, attributes, ..
        } => {
            let element = match doc.create_element(name) {
                Ok(element) => element,
                Err(err) => {
                    log::trace!(target: "mirror.markup", "skipping tag {name:?}: {err}");
                    return None;
                }
            };
            for (key, value) in attributes {
                if let Err(err) = doc.set_attribute(element, key, value) {
                    log::trace!(target: "mirror.markup", "skipping attribute {key:?}: {err}");
                }
            }
            Some(element)
        }
        Token::Text(text) => Some(doc.create_text_node(text.clone())),
        Token::Comment(text) => Some(doc.create_comment(text.clone())),
        Token::Doctype(_) | Token::EndTag(_) => None,
    }
}

fn append_or_log(doc: &mut Document, parent: NodeId, node: NodeId) -> bool {
    match doc.append_child(parent, node) {
        Ok(_) => true,
        Err(err) => {
            log::trace!(target: "mirror.markup", "dropping parsed node: {err}");
            false
        }
    }
}
