//! Turns an intercepted mutation into a `Patch`.
//!
//! Encoding runs against the primary tree as it was *before* the mutation: that is
//! the state the replica will be in when it applies the patch, so paths computed
//! here resolve to the same nodes there.
use thiserror::Error;

use crate::dom_patch::{Patch, PatchArg};
use crate::ops::{MutationRecord, Value};
use crate::path::path_of;
use crate::snapshot::{WireError, snapshot};
use crate::types::{Document, NodeId};

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The node is neither addressable by path nor detached from the document
    /// (for example it sits inside a shadow tree of an attached host).
    #[error("argument {index} is neither addressable nor detached")]
    DetachedArgument { index: usize },
    #[error("argument {index}: {source}")]
    Snapshot {
        index: usize,
        #[source]
        source: WireError,
    },
}

/// Returns `Ok(None)` when the target is no longer attached to the document.
pub fn encode(doc: &Document, record: &MutationRecord) -> Result<Option<Patch>, EncodeError> {
    let root = doc.root();
    let Some(target_path) = path_of(doc, record.target, root) else {
        log::trace!(
            target: "mirror.encode",
            "dropping {} on unattached node {:?}",
            record.operation,
            record.target
        );
        return Ok(None);
    };
    let args = record
        .args
        .iter()
        .enumerate()
        .map(|(index, value)| encode_arg(doc, index, value))
        .collect::<Result<Vec<_>, _>>()?;
    let patch = Patch {
        target_path,
        prop: record.operation.clone(),
        args,
    };
    log::trace!(target: "mirror.encode", "encoded {} at {}", patch.prop, patch.target_path);
    Ok(Some(patch))
}

fn encode_arg(doc: &Document, index: usize, value: &Value) -> Result<PatchArg, EncodeError> {
    Ok(match value {
        Value::Null => PatchArg::Null,
        Value::Bool(b) => PatchArg::Bool(*b),
        Value::Number(n) => PatchArg::Number(*n),
        Value::String(s) => PatchArg::String(s.clone()),
        Value::Node(node) => encode_node(doc, index, *node)?,
    })
}

fn encode_node(doc: &Document, index: usize, node: NodeId) -> Result<PatchArg, EncodeError> {
    if doc.is_attached(node) {
        return path_of(doc, node, doc.root())
            .map(PatchArg::Path)
            .ok_or(EncodeError::DetachedArgument { index });
    }
    if doc.is_connected(node) {
        return Err(EncodeError::DetachedArgument { index });
    }
    snapshot(doc, node)
        .map(PatchArg::Node)
        .map_err(|source| EncodeError::Snapshot { index, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Holder, NodeMember, Operation};
    use crate::path::NodePath;
    use crate::snapshot::WireNode;

    fn doc() -> (Document, NodeId) {
        let doc = Document::parse("<html><head></head><body><p>a</p><p>b</p></body></html>");
        let body = doc.body().unwrap();
        (doc, body)
    }

    #[test]
    fn detached_arguments_become_snapshots() {
        let (mut doc, body) = doc();
        let button = doc.create_element("button").unwrap();
        let text = doc.create_text_node("Go");
        doc.append_child(button, text).unwrap();
        let record = MutationRecord::new(body, NodeMember::AppendChild, vec![button.into()]);
        let patch = encode(&doc, &record).unwrap().unwrap();
        assert_eq!(patch.target_path, NodePath(vec![0, 1]));
        assert_eq!(
            patch.args,
            vec![PatchArg::Node(WireNode::Element {
                tag: "button".into(),
                attributes: vec![],
                children: vec![WireNode::text("Go")],
                shadow: None,
            })]
        );
    }

    #[test]
    fn attached_arguments_become_paths() {
        let (doc, body) = doc();
        let second = doc.children(body)[1];
        let first = doc.children(body)[0];
        let record = MutationRecord::new(
            body,
            NodeMember::InsertBefore,
            vec![second.into(), first.into()],
        );
        let patch = encode(&doc, &record).unwrap().unwrap();
        assert_eq!(
            patch.args,
            vec![
                PatchArg::Path(NodePath(vec![0, 1, 1])),
                PatchArg::Path(NodePath(vec![0, 1, 0])),
            ]
        );
    }

    #[test]
    fn unattached_targets_are_dropped() {
        let (mut doc, _) = doc();
        let orphan = doc.create_element("div").unwrap();
        let record = MutationRecord::new(
            orphan,
            Operation::nested(Holder::ClassList, "add"),
            vec!["x".into()],
        );
        assert!(encode(&doc, &record).unwrap().is_none());
    }

    #[test]
    fn shadow_tree_arguments_are_rejected() {
        let (mut doc, body) = doc();
        let host = doc.create_element("x-host").unwrap();
        doc.append_child(body, host).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let inner = doc.create_element("span").unwrap();
        doc.append_child(shadow, inner).unwrap();
        let record = MutationRecord::new(body, NodeMember::AppendChild, vec![inner.into()]);
        assert!(matches!(
            encode(&doc, &record),
            Err(EncodeError::DetachedArgument { index: 0 })
        ));
    }
}
