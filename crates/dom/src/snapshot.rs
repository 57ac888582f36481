//! Self-contained subtree snapshots and their wire shape.
//!
//! Wire shape (JSON):
//! - element: `[tag, {attr: value, ...}, [children...]]`, with an optional fourth
//!   array holding the children of an attached shadow root
//! - text: `["Text", "content"]` or `["Text", null]`
//! - comment: `["Comment", "content"]`
//!
//! Tags are always lower-case, so the capitalised markers cannot collide with an
//! element tag.
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::json::with_stack;
use crate::types::{DomError, Document, NodeId, NodeKind};

const TEXT_MARKER: &str = "Text";
const COMMENT_MARKER: &str = "Comment";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<WireNode>,
        shadow: Option<Vec<WireNode>>,
    },
    Text(Option<String>),
    Comment(String),
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed wire node: {0}")]
    Malformed(String),
    #[error("a shadow root travels with its host; snapshot the host element instead")]
    ShadowRoot,
    #[error("full snapshots must describe an element")]
    NotAnElement,
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WireNode {
    pub fn element(tag: impl Into<String>) -> Self {
        WireNode::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            shadow: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        WireNode::Text(Some(text.into()))
    }

    pub fn to_json(&self) -> Json {
        with_stack(|| match self {
            WireNode::Element {
                tag,
                attributes,
                children,
                shadow,
            } => {
                let attrs: Map<String, Json> = attributes
                    .iter()
                    .map(|(key, value)| (key.clone(), Json::String(value.clone())))
                    .collect();
                let mut tuple = vec![
                    Json::String(tag.clone()),
                    Json::Object(attrs),
                    Json::Array(children.iter().map(WireNode::to_json).collect()),
                ];
                if let Some(shadow) = shadow {
                    tuple.push(Json::Array(shadow.iter().map(WireNode::to_json).collect()));
                }
                Json::Array(tuple)
            }
            WireNode::Text(text) => Json::Array(vec![
                Json::String(TEXT_MARKER.to_string()),
                text.clone().map_or(Json::Null, Json::String),
            ]),
            WireNode::Comment(text) => Json::Array(vec![
                Json::String(COMMENT_MARKER.to_string()),
                Json::String(text.clone()),
            ]),
        })
    }

    pub fn from_json(value: &Json) -> Result<Self, WireError> {
        with_stack(|| Self::from_json_level(value))
    }

    fn from_json_level(value: &Json) -> Result<Self, WireError> {
        let Json::Array(items) = value else {
            return Err(WireError::Malformed(format!("expected an array, got {value}")));
        };
        let Some(Json::String(head)) = items.first() else {
            return Err(WireError::Malformed("missing tag".to_string()));
        };
        match (head.as_str(), items.len()) {
            (TEXT_MARKER, 2) => match &items[1] {
                Json::Null => Ok(WireNode::Text(None)),
                Json::String(text) => Ok(WireNode::Text(Some(text.clone()))),
                other => Err(WireError::Malformed(format!("text payload {other}"))),
            },
            (COMMENT_MARKER, 2) => match &items[1] {
                Json::String(text) => Ok(WireNode::Comment(text.clone())),
                other => Err(WireError::Malformed(format!("comment payload {other}"))),
            },
            (tag, 3 | 4) => {
                let Json::Object(attrs) = &items[1] else {
                    return Err(WireError::Malformed(format!("attributes of <{tag}>")));
                };
                let attributes = attrs
                    .iter()
                    .map(|(key, value)| match value {
                        Json::String(value) => Ok((key.clone(), value.clone())),
                        other => Err(WireError::Malformed(format!(
                            "attribute {key} of <{tag}> is {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let children = decode_children(&items[2], tag)?;
                let shadow = items.get(3).map(|slot| decode_children(slot, tag)).transpose()?;
                Ok(WireNode::Element {
                    tag: tag.to_string(),
                    attributes,
                    children,
                    shadow,
                })
            }
            (tag, len) => Err(WireError::Malformed(format!(
                "{len}-tuple headed by {tag:?}"
            ))),
        }
    }

    /// Decodes a snapshot of any depth.
    pub fn parse(json: &str) -> Result<Self, WireError> {
        let value: Json = crate::json::from_str(json)?;
        Self::from_json(&value)
    }
}

fn decode_children(value: &Json, tag: &str) -> Result<Vec<WireNode>, WireError> {
    let Json::Array(children) = value else {
        return Err(WireError::Malformed(format!("children of <{tag}>")));
    };
    children.iter().map(WireNode::from_json).collect()
}

struct Attributes<'a>(&'a [(String, String)]);

impl Serialize for Attributes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
    }
}

impl Serialize for WireNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        with_stack(move || match self {
            WireNode::Element {
                tag,
                attributes,
                children,
                shadow,
            } => {
                let len = if shadow.is_some() { 4 } else { 3 };
                let mut tuple = serializer.serialize_seq(Some(len))?;
                tuple.serialize_element(tag)?;
                tuple.serialize_element(&Attributes(attributes))?;
                tuple.serialize_element(children)?;
                if let Some(shadow) = shadow {
                    tuple.serialize_element(shadow)?;
                }
                tuple.end()
            }
            WireNode::Text(text) => (TEXT_MARKER, text).serialize(serializer),
            WireNode::Comment(text) => (COMMENT_MARKER, text).serialize(serializer),
        })
    }
}

impl<'de> Deserialize<'de> for WireNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Json::deserialize(serde_stacker::Deserializer::new(deserializer))?;
        WireNode::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Snapshots `node` and its whole subtree. A document snapshots as its document
/// element.
pub fn snapshot(doc: &Document, node: NodeId) -> Result<WireNode, WireError> {
    with_stack(|| snapshot_level(doc, node))
}

fn snapshot_level(doc: &Document, node: NodeId) -> Result<WireNode, WireError> {
    match doc.kind(node).ok_or(DomError::UnknownNode(node))? {
        NodeKind::Document { .. } => {
            let element = doc.document_element().ok_or(WireError::NotAnElement)?;
            snapshot(doc, element)
        }
        NodeKind::Element {
            name,
            attributes,
            shadow_root,
        } => {
            let children = doc
                .children(node)
                .iter()
                .map(|&child| snapshot(doc, child))
                .collect::<Result<Vec<_>, _>>()?;
            let shadow = shadow_root
                .map(|shadow| {
                    doc.children(shadow)
                        .iter()
                        .map(|&child| snapshot(doc, child))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?;
            Ok(WireNode::Element {
                tag: name.clone(),
                attributes: attributes.clone(),
                children,
                shadow,
            })
        }
        NodeKind::Text { text } => Ok(WireNode::Text(Some(text.clone()))),
        NodeKind::Comment { text } => Ok(WireNode::Comment(text.clone())),
        NodeKind::ShadowRoot { .. } => Err(WireError::ShadowRoot),
    }
}

/// Builds brand-new detached nodes in `doc` from `wire`.
pub fn materialize(doc: &mut Document, wire: &WireNode) -> Result<NodeId, WireError> {
    with_stack(|| materialize_level(doc, wire))
}

fn materialize_level(doc: &mut Document, wire: &WireNode) -> Result<NodeId, WireError> {
    match wire {
        WireNode::Element {
            tag,
            attributes,
            children,
            shadow,
        } => {
            let element = doc.create_element(tag)?;
            for (key, value) in attributes {
                doc.set_attribute(element, key, value)?;
            }
            for child in children {
                let child = materialize(doc, child)?;
                doc.append_child(element, child)?;
            }
            if let Some(shadow) = shadow {
                let root = doc.attach_shadow(element)?;
                for child in shadow {
                    let child = materialize(doc, child)?;
                    doc.append_child(root, child)?;
                }
            }
            Ok(element)
        }
        WireNode::Text(text) => Ok(doc.create_text_node(text.clone().unwrap_or_default())),
        WireNode::Comment(text) => Ok(doc.create_comment(text.clone())),
    }
}

/// Builds a fresh document whose document element is `wire`.
pub fn document_from_snapshot(wire: &WireNode) -> Result<Document, WireError> {
    if !matches!(wire, WireNode::Element { .. }) {
        return Err(WireError::NotAnElement);
    }
    let mut doc = Document::new();
    let element = materialize(&mut doc, wire)?;
    let root = doc.root();
    doc.append_child(root, element)?;
    Ok(doc)
}
