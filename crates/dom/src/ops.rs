//! The mutation vocabulary shared by the primary and the replica.
//!
//! An `Operation` names either a member of the node itself (`"appendChild"`) or a
//! member of a nested holder (`["classList", "add"]`). Resolution turns it into a
//! typed `Member`; `invoke` runs it against a `Document`. Both sides go through the
//! same table, so an operation the primary can report is one the replica can apply.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::class_list::ClassListMut;
use crate::dataset::DatasetMut;
use crate::style::StyleMut;
use crate::types::{ChildItem, Document, DomError, NodeId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    segments: Vec<String>,
}

impl Operation {
    pub fn node(member: NodeMember) -> Self {
        Self {
            segments: vec![member.name().to_string()],
        }
    }

    pub fn nested(holder: Holder, member: impl Into<String>) -> Self {
        Self {
            segments: vec![holder.name().to_string(), member.into()],
        }
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn resolve(&self) -> Result<Member, InvokeError> {
        let unknown = || InvokeError::UnknownOperation(self.to_string());
        match self.segments.as_slice() {
            [name] => NodeMember::from_name(name).map(Member::Node).ok_or_else(unknown),
            [holder, name] => match Holder::from_name(holder).ok_or_else(unknown)? {
                Holder::Node => NodeMember::from_name(name).map(Member::Node).ok_or_else(unknown),
                Holder::Style => StyleMember::from_name(name).map(Member::Style).ok_or_else(unknown),
                Holder::ClassList => ClassListMember::from_name(name)
                    .map(Member::ClassList)
                    .ok_or_else(unknown),
                Holder::Attributes => AttributesMember::from_name(name)
                    .map(Member::Attributes)
                    .ok_or_else(unknown),
                Holder::Dataset if !name.is_empty() => Ok(Member::Dataset(name.clone())),
                Holder::Dataset => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<NodeMember> for Operation {
    fn from(member: NodeMember) -> Self {
        Operation::node(member)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.segments.as_slice() {
            [single] => serializer.serialize_str(single),
            segments => segments.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Single(String),
            Path(Vec<String>),
        }
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Single(name) => Operation::from_segments(vec![name]),
            Wire::Path(segments) => Operation::from_segments(segments),
        })
    }
}

/// The object an operation's final member lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Holder {
    Node,
    Style,
    ClassList,
    Attributes,
    Dataset,
}

impl Holder {
    pub fn name(self) -> &'static str {
        match self {
            Holder::Node => "node",
            Holder::Style => "style",
            Holder::ClassList => "classList",
            Holder::Attributes => "attributes",
            Holder::Dataset => "dataset",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "style" => Holder::Style,
            "classList" => Holder::ClassList,
            "attributes" => Holder::Attributes,
            "dataset" => Holder::Dataset,
            _ => return None,
        })
    }
}

macro_rules! vocabulary {
    ($ty:ident { $($variant:ident => $name:literal : $callable:literal),* $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $ty {
            $($variant),*
        }

        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),*
                }
            }

            pub fn is_callable(self) -> bool {
                match self {
                    $($ty::$variant => $callable),*
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some($ty::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

vocabulary!(NodeMember {
    AppendChild => "appendChild": true,
    InsertBefore => "insertBefore": true,
    ReplaceChild => "replaceChild": true,
    RemoveChild => "removeChild": true,
    Remove => "remove": true,
    Before => "before": true,
    After => "after": true,
    ReplaceWith => "replaceWith": true,
    Append => "append": true,
    Prepend => "prepend": true,
    SetAttribute => "setAttribute": true,
    RemoveAttribute => "removeAttribute": true,
    ToggleAttribute => "toggleAttribute": true,
    TextContent => "textContent": false,
    InnerHtml => "innerHTML": false,
    Id => "id": false,
    ClassName => "className": false,
    NodeValue => "nodeValue": false,
    Data => "data": false,
});

vocabulary!(ClassListMember {
    Add => "add": true,
    Remove => "remove": true,
    Toggle => "toggle": true,
    Replace => "replace": true,
    Value => "value": false,
});

vocabulary!(AttributesMember {
    SetNamedItem => "setNamedItem": true,
    RemoveNamedItem => "removeNamedItem": true,
});

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StyleMember {
    SetProperty,
    RemoveProperty,
    CssText,
    /// Assignment to a named property such as `style.color`.
    Property(String),
}

impl StyleMember {
    pub fn is_callable(&self) -> bool {
        matches!(self, StyleMember::SetProperty | StyleMember::RemoveProperty)
    }

    /// Names that can be assigned as `style[name]`: IDL attributes, dashed
    /// property names and custom properties (`--anything-but-whitespace`).
    pub fn is_property_name(name: &str) -> bool {
        match name.strip_prefix("--") {
            Some(custom) => !custom.is_empty() && !custom.chars().any(char::is_whitespace),
            None => {
                !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
            }
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "setProperty" => Some(StyleMember::SetProperty),
            "removeProperty" => Some(StyleMember::RemoveProperty),
            "cssText" => Some(StyleMember::CssText),
            _ if Self::is_property_name(name) => Some(StyleMember::Property(name.to_string())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Member {
    Node(NodeMember),
    Style(StyleMember),
    ClassList(ClassListMember),
    Attributes(AttributesMember),
    /// Assignment to `dataset[key]`.
    Dataset(String),
}

impl Member {
    /// Callable members are invoked with their arguments; the rest are assigned
    /// exactly one value.
    pub fn is_callable(&self) -> bool {
        match self {
            Member::Node(member) => member.is_callable(),
            Member::Style(member) => member.is_callable(),
            Member::ClassList(member) => member.is_callable(),
            Member::Attributes(member) => member.is_callable(),
            Member::Dataset(_) => false,
        }
    }
}

/// A dynamically typed argument or return value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Node(NodeId),
}

impl Value {
    /// JavaScript `ToString` for primitives; `None` for nodes.
    pub fn to_js_string(&self) -> Option<String> {
        Some(match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Node(_) => return None,
        })
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// `Number.prototype.toString()`: shortest round-trip digits, written out in full
/// for decimal exponents in `-7..21` and in exponent form otherwise.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    // `{:e}` yields the shortest digits as `d.ddde<exp>`
    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    // position of the decimal point relative to the digits
    let point = exponent + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if n < 0.0 {
        out.push('-');
    }
    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(point as usize);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.unsigned_abs().to_string());
    }
    out
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Node(value)
    }
}

impl From<Option<NodeId>> for Value {
    fn from(value: Option<NodeId>) -> Self {
        value.map_or(Value::Null, Value::Node)
    }
}

/// One intercepted mutation: the target, the operation and the raw arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub operation: Operation,
    pub args: Vec<Value>,
}

impl MutationRecord {
    pub fn new(target: NodeId, operation: impl Into<Operation>, args: Vec<Value>) -> Self {
        Self {
            target,
            operation: operation.into(),
            args,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InvokeError {
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("{operation} expects {expected} argument(s), got {got}")]
    Arity {
        operation: String,
        expected: &'static str,
        got: usize,
    },
    #[error("{operation}: argument {index} must be {expected}")]
    ArgumentType {
        operation: String,
        index: usize,
        expected: &'static str,
    },
    #[error(transparent)]
    Dom(#[from] DomError),
}

struct Args<'a> {
    operation: &'a Operation,
    values: Vec<Value>,
}

impl Args<'_> {
    fn arity(&self, min: usize, max: usize, expected: &'static str) -> Result<(), InvokeError> {
        if (min..=max).contains(&self.values.len()) {
            Ok(())
        } else {
            Err(InvokeError::Arity {
                operation: self.operation.to_string(),
                expected,
                got: self.values.len(),
            })
        }
    }

    fn type_error(&self, index: usize, expected: &'static str) -> InvokeError {
        InvokeError::ArgumentType {
            operation: self.operation.to_string(),
            index,
            expected,
        }
    }

    fn node(&self, index: usize) -> Result<NodeId, InvokeError> {
        self.values
            .get(index)
            .and_then(Value::as_node)
            .ok_or_else(|| self.type_error(index, "a node"))
    }

    fn optional_node(&self, index: usize) -> Result<Option<NodeId>, InvokeError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Node(id)) => Ok(Some(*id)),
            Some(_) => Err(self.type_error(index, "a node or null")),
        }
    }

    fn string(&self, index: usize) -> Result<String, InvokeError> {
        self.values
            .get(index)
            .and_then(Value::to_js_string)
            .ok_or_else(|| self.type_error(index, "a primitive"))
    }

    /// `null` becomes the empty string, as for `[LegacyNullToEmptyString]` members.
    fn nullable_string(&self, index: usize) -> Result<String, InvokeError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(_) => self.string(index),
        }
    }

    fn optional_bool(&self, index: usize) -> Option<bool> {
        match self.values.get(index) {
            None => None,
            Some(Value::Null) => Some(false),
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => Some(*n != 0.0 && !n.is_nan()),
            Some(Value::String(s)) => Some(!s.is_empty()),
            Some(Value::Node(_)) => Some(true),
        }
    }

    fn strings(&self) -> Result<Vec<String>, InvokeError> {
        (0..self.values.len()).map(|i| self.string(i)).collect()
    }

    fn child_items(&self) -> Vec<ChildItem> {
        self.values
            .iter()
            .map(|value| match value {
                Value::Node(id) => ChildItem::Node(*id),
                other => ChildItem::Text(other.to_js_string().unwrap_or_default()),
            })
            .collect()
    }
}

/// Performs `operation` on `target` with dynamically typed arguments.
pub fn invoke(
    doc: &mut Document,
    target: NodeId,
    operation: &Operation,
    args: Vec<Value>,
) -> Result<Value, InvokeError> {
    let member = operation.resolve()?;
    let args = Args {
        operation,
        values: args,
    };
    if !member.is_callable() {
        args.arity(1, 1, "exactly one")?;
    }
    match member {
        Member::Node(member) => invoke_node(doc, target, member, &args),
        Member::Style(member) => {
            let mut style = StyleMut::new(doc, target)?;
            match member {
                StyleMember::SetProperty => {
                    args.arity(2, 3, "two or three")?;
                    let name = args.string(0)?;
                    let value = args.nullable_string(1)?;
                    let priority = args.nullable_string(2)?;
                    style.set_property(&name, &value, &priority)?;
                    Ok(Value::Null)
                }
                StyleMember::RemoveProperty => {
                    args.arity(1, 1, "one")?;
                    Ok(Value::String(style.remove_property(&args.string(0)?)?))
                }
                StyleMember::CssText => {
                    style.set_css_text(&args.nullable_string(0)?)?;
                    Ok(Value::Null)
                }
                StyleMember::Property(name) => {
                    style.set_named(&name, &args.nullable_string(0)?)?;
                    Ok(Value::Null)
                }
            }
        }
        Member::ClassList(member) => {
            let mut list = ClassListMut::new(doc, target)?;
            match member {
                ClassListMember::Add => {
                    list.add(&args.strings()?)?;
                    Ok(Value::Null)
                }
                ClassListMember::Remove => {
                    list.remove(&args.strings()?)?;
                    Ok(Value::Null)
                }
                ClassListMember::Toggle => {
                    args.arity(1, 2, "one or two")?;
                    let token = args.string(0)?;
                    Ok(Value::Bool(list.toggle(&token, args.optional_bool(1))?))
                }
                ClassListMember::Replace => {
                    args.arity(2, 2, "two")?;
                    Ok(Value::Bool(list.replace(&args.string(0)?, &args.string(1)?)?))
                }
                ClassListMember::Value => {
                    list.set_value(&args.string(0)?)?;
                    Ok(Value::Null)
                }
            }
        }
        Member::Attributes(member) => match member {
            AttributesMember::SetNamedItem => {
                args.arity(2, 2, "two")?;
                doc.set_attribute(target, &args.string(0)?, &args.string(1)?)?;
                Ok(Value::Null)
            }
            AttributesMember::RemoveNamedItem => {
                args.arity(1, 1, "one")?;
                let name = args.string(0)?;
                let old = doc
                    .get_attribute(target, &name)
                    .map(str::to_string)
                    .ok_or(DomError::NotFound("no attribute with that name"))?;
                doc.remove_attribute(target, &name)?;
                Ok(Value::String(old))
            }
        },
        Member::Dataset(key) => {
            let mut dataset = DatasetMut::new(doc, target)?;
            match &args.values[0] {
                Value::Null => {
                    dataset.delete(&key)?;
                }
                _ => dataset.set(&key, &args.string(0)?)?,
            }
            Ok(Value::Null)
        }
    }
}

fn invoke_node(
    doc: &mut Document,
    target: NodeId,
    member: NodeMember,
    args: &Args<'_>,
) -> Result<Value, InvokeError> {
    match member {
        NodeMember::AppendChild => {
            args.arity(1, 1, "one")?;
            Ok(Value::Node(doc.append_child(target, args.node(0)?)?))
        }
        NodeMember::InsertBefore => {
            args.arity(1, 2, "one or two")?;
            let node = args.node(0)?;
            let reference = args.optional_node(1)?;
            Ok(Value::Node(doc.insert_before(target, node, reference)?))
        }
        NodeMember::ReplaceChild => {
            args.arity(2, 2, "two")?;
            Ok(Value::Node(doc.replace_child(target, args.node(0)?, args.node(1)?)?))
        }
        NodeMember::RemoveChild => {
            args.arity(1, 1, "one")?;
            Ok(Value::Node(doc.remove_child(target, args.node(0)?)?))
        }
        NodeMember::Remove => {
            doc.remove(target)?;
            Ok(Value::Null)
        }
        NodeMember::Before => {
            doc.before(target, args.child_items())?;
            Ok(Value::Null)
        }
        NodeMember::After => {
            doc.after(target, args.child_items())?;
            Ok(Value::Null)
        }
        NodeMember::ReplaceWith => {
            doc.replace_with(target, args.child_items())?;
            Ok(Value::Null)
        }
        NodeMember::Append => {
            doc.append(target, args.child_items())?;
            Ok(Value::Null)
        }
        NodeMember::Prepend => {
            doc.prepend(target, args.child_items())?;
            Ok(Value::Null)
        }
        NodeMember::SetAttribute => {
            args.arity(2, 2, "two")?;
            doc.set_attribute(target, &args.string(0)?, &args.string(1)?)?;
            Ok(Value::Null)
        }
        NodeMember::RemoveAttribute => {
            args.arity(1, 1, "one")?;
            doc.remove_attribute(target, &args.string(0)?)?;
            Ok(Value::Null)
        }
        NodeMember::ToggleAttribute => {
            args.arity(1, 2, "one or two")?;
            let name = args.string(0)?;
            Ok(Value::Bool(doc.toggle_attribute(target, &name, args.optional_bool(1))?))
        }
        NodeMember::TextContent => {
            doc.set_text_content(target, Some(&args.nullable_string(0)?))?;
            Ok(Value::Null)
        }
        NodeMember::InnerHtml => {
            doc.set_inner_html(target, &args.nullable_string(0)?)?;
            Ok(Value::Null)
        }
        NodeMember::Id => {
            doc.set_id(target, &args.string(0)?)?;
            Ok(Value::Null)
        }
        NodeMember::ClassName => {
            doc.set_class_name(target, &args.string(0)?)?;
            Ok(Value::Null)
        }
        NodeMember::NodeValue => {
            doc.set_node_value(target, Some(&args.nullable_string(0)?))?;
            Ok(Value::Null)
        }
        NodeMember::Data => {
            if doc.data(target).is_none() {
                let kind = doc.kind(target).ok_or(DomError::UnknownNode(target))?.label();
                return Err(DomError::WrongNodeKind { kind }.into());
            }
            doc.set_node_value(target, Some(&args.nullable_string(0)?))?;
            Ok(Value::Null)
        }
    }
}
