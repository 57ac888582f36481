//! Structural node addressing.
//!
//! A `NodePath` is a sequence of child indices from a root. Below a document node
//! indices count element children only, so doctype/comment preamble never shifts
//! addresses; everywhere else indices count all child nodes. Both directions use the
//! same rule, so `resolve(root, path_of(n, root)) == Some(n)` for every node attached
//! under `root`.
//!
//! Paths are only valid for one tree state. Compute them when sending and resolve
//! them when applying; never cache them.
use serde::{Deserialize, Serialize};

use crate::types::{Document, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<u32>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for NodePath {
    fn from(value: Vec<u32>) -> Self {
        NodePath(value)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{segment}")?;
        }
        write!(f, "]")
    }
}

fn child_index(doc: &Document, parent: NodeId, node: NodeId) -> Option<usize> {
    if doc.is_document(parent) {
        doc.element_children(parent).position(|child| child == node)
    } else {
        doc.children(parent).iter().position(|&child| child == node)
    }
}

fn nth_child(doc: &Document, parent: NodeId, index: usize) -> Option<NodeId> {
    if doc.is_document(parent) {
        doc.element_children(parent).nth(index)
    } else {
        doc.children(parent).get(index).copied()
    }
}

/// Returns `None` when `root` is not an inclusive ancestor of `node`.
pub fn path_of(doc: &Document, node: NodeId, root: NodeId) -> Option<NodePath> {
    let mut segments = Vec::new();
    let mut current = node;
    while current != root {
        let parent = doc.parent(current)?;
        let index = child_index(doc, parent, current)?;
        segments.push(u32::try_from(index).ok()?);
        current = parent;
    }
    segments.reverse();
    Some(NodePath(segments))
}

/// Returns `None` on any out-of-range segment.
pub fn resolve(doc: &Document, root: NodeId, path: &NodePath) -> Option<NodeId> {
    doc.kind(root)?;
    path.0
        .iter()
        .try_fold(root, |current, &index| nth_child(doc, current, index as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_nodes(doc: &Document, node: NodeId, out: &mut Vec<NodeId>) {
        out.push(node);
        for &child in doc.children(node) {
            all_nodes(doc, child, out);
        }
    }

    #[test]
    fn preamble_does_not_shift_document_level_indices() {
        let doc = Document::parse("<!DOCTYPE html><!--lead--><html><head></head><body><i></i></body></html>");
        let body = doc.body().unwrap();
        assert_eq!(path_of(&doc, body, doc.root()), Some(NodePath(vec![0, 1])));
    }

    #[test]
    fn every_attached_node_resolves_to_itself() {
        let doc = Document::parse(
            "<!--x--><html><head><title>t</title></head><body>a<!--b--><p>c<em>d</em></p>e</body></html>",
        );
        let mut nodes = Vec::new();
        all_nodes(&doc, doc.root(), &mut nodes);
        for node in nodes {
            if doc.parent(node) == Some(doc.root()) && !doc.is_element(node) {
                continue;
            }
            let path = path_of(&doc, node, doc.root()).unwrap();
            assert_eq!(resolve(&doc, doc.root(), &path), Some(node), "path {path}");
        }
    }

    #[test]
    fn detached_nodes_have_no_path() {
        let mut doc = Document::parse("<html><body></body></html>");
        let orphan = doc.create_element("div").unwrap();
        assert_eq!(path_of(&doc, orphan, doc.root()), None);
    }

    #[test]
    fn out_of_range_segments_resolve_to_none() {
        let doc = Document::parse("<html><body></body></html>");
        assert_eq!(resolve(&doc, doc.root(), &NodePath(vec![0, 7])), None);
        assert_eq!(resolve(&doc, doc.root(), &NodePath::root()), Some(doc.root()));
    }

    #[test]
    fn paths_serialize_as_plain_arrays() {
        let json = serde_json::to_string(&NodePath(vec![0, 1, 2])).unwrap();
        assert_eq!(json, "[0,1,2]");
    }
}
