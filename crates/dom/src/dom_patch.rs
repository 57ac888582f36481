//! The patch wire record.
//!
//! Invariants:
//! - `target_path` is computed against the primary's tree just before the mutation
//!   runs and resolved against the replica's current tree when applied.
//! - Patches are applied in the order they were produced.
//! - Node arguments are either a path to a node that exists in both trees or a
//!   self-contained snapshot; live node handles never cross the boundary.
//!
//! Wire shape: `{"targetPath": [..], "prop": "name" | ["holder", "name"], "args": [..]}`
//! where every arg is `null`, a boolean, a number, a string, a path (array of
//! numbers) or a snapshot (array headed by a string).
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

use crate::ops::Operation;
use crate::path::NodePath;
use crate::snapshot::WireNode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub target_path: NodePath,
    pub prop: Operation,
    #[serde(default)]
    pub args: Vec<PatchArg>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatchArg {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Path(NodePath),
    Node(WireNode),
}

impl PatchArg {
    pub fn to_json(&self) -> Json {
        match self {
            PatchArg::Null => Json::Null,
            PatchArg::Bool(b) => Json::Bool(*b),
            PatchArg::Number(n) => number_to_json(*n),
            PatchArg::String(s) => Json::String(s.clone()),
            PatchArg::Path(path) => Json::Array(path.0.iter().map(|&i| Json::from(i)).collect()),
            PatchArg::Node(node) => node.to_json(),
        }
    }

    pub fn from_json(value: &Json) -> Result<Self, String> {
        Ok(match value {
            Json::Null => PatchArg::Null,
            Json::Bool(b) => PatchArg::Bool(*b),
            Json::Number(n) => PatchArg::Number(n.as_f64().ok_or("number out of range")?),
            Json::String(s) => PatchArg::String(s.clone()),
            Json::Array(items) if items.iter().all(Json::is_number) => {
                let segments = items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|i| u32::try_from(i).ok())
                            .ok_or_else(|| format!("path segment {item} is not an index"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                PatchArg::Path(NodePath(segments))
            }
            Json::Array(_) => PatchArg::Node(WireNode::from_json(value).map_err(|e| e.to_string())?),
            Json::Object(_) => return Err("objects are not valid patch arguments".to_string()),
        })
    }
}

/// Integral numbers go out as integers so that `5` does not become `5.0`.
fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n == n.trunc() && n.abs() <= i64::MAX as f64 {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

impl Serialize for PatchArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PatchArg::Node(node) => node.serialize(serializer),
            other => other.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PatchArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Json::deserialize(serde_stacker::Deserializer::new(deserializer))?;
        PatchArg::from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for PatchArg {
    fn from(value: &str) -> Self {
        PatchArg::String(value.to_string())
    }
}

impl From<WireNode> for PatchArg {
    fn from(value: WireNode) -> Self {
        PatchArg::Node(value)
    }
}

impl From<NodePath> for PatchArg {
    fn from(value: NodePath) -> Self {
        PatchArg::Path(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Holder, NodeMember};
    use serde_json::json;

    #[test]
    fn patch_wire_shape_uses_camel_case_keys() {
        let patch = Patch {
            target_path: NodePath(vec![0, 1]),
            prop: NodeMember::TextContent.into(),
            args: vec![PatchArg::Number(5.0)],
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"targetPath": [0, 1], "prop": "textContent", "args": [5]})
        );
    }

    #[test]
    fn args_decode_by_shape() {
        let patch: Patch = serde_json::from_value(json!({
            "targetPath": [],
            "prop": ["classList", "add"],
            "args": [null, true, 1.5, "s", [0, 2], ["b", {}, [["Text", null]]]]
        }))
        .unwrap();
        assert_eq!(patch.prop, Operation::nested(Holder::ClassList, "add"));
        assert_eq!(
            patch.args,
            vec![
                PatchArg::Null,
                PatchArg::Bool(true),
                PatchArg::Number(1.5),
                PatchArg::String("s".into()),
                PatchArg::Path(NodePath(vec![0, 2])),
                PatchArg::Node(WireNode::Element {
                    tag: "b".into(),
                    attributes: vec![],
                    children: vec![WireNode::Text(None)],
                    shadow: None,
                }),
            ]
        );
    }

    #[test]
    fn deep_snapshot_arguments_decode() {
        let mut node = WireNode::text("leaf");
        for _ in 0..200 {
            node = WireNode::Element {
                tag: "div".into(),
                attributes: vec![],
                children: vec![node],
                shadow: None,
            };
        }
        let patch = Patch {
            target_path: NodePath(vec![0, 1]),
            prop: NodeMember::AppendChild.into(),
            args: vec![PatchArg::Node(node)],
        };
        let text = serde_json::to_string(&patch).unwrap();
        assert!(serde_json::from_str::<Patch>(&text).is_err());
        let back: Patch = crate::json::from_str(&text).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn empty_array_is_the_root_path() {
        assert_eq!(
            PatchArg::from_json(&json!([])).unwrap(),
            PatchArg::Path(NodePath::root())
        );
        assert!(PatchArg::from_json(&json!([0, -1])).is_err());
        assert!(PatchArg::from_json(&json!({"a": 1})).is_err());
    }
}
