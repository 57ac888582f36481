//! Document tree, mutation vocabulary and patch encoding shared by both ends of
//! the mirror.
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;

mod builder;
mod class_list;
mod dataset;
mod dom_patch;
mod encode;
pub mod json;
mod markup;
mod ops;
mod path;
mod serialize;
mod snapshot;
mod style;
mod types;

pub use crate::builder::parse_fragment;
pub use crate::class_list::{ClassList, ClassListMut};
pub use crate::dataset::{Dataset, DatasetMut, attribute_for_key, key_for_attribute};
pub use crate::dom_patch::{Patch, PatchArg};
pub use crate::encode::{EncodeError, encode};
pub use crate::markup::{is_raw_text_element, is_void_element};
pub use crate::ops::{
    AttributesMember, ClassListMember, Holder, InvokeError, Member, MutationRecord, NodeMember,
    Operation, StyleMember, Value, invoke,
};
pub use crate::path::{NodePath, path_of, resolve};
pub use crate::snapshot::{WireError, WireNode, document_from_snapshot, materialize, snapshot};
pub use crate::style::{Declaration, Style, StyleMut, css_property_name};
pub use crate::types::{ChildItem, Document, DomError, NodeId, NodeKind};
