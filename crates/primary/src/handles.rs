//! Typed, intercepted views of an element's nested mutable objects.
//!
//! Each handle reports its mutations as `[holder, member]` operations, e.g.
//! `style.setProperty(..)` becomes `["style", "setProperty"]`.
use dom::{
    ClassListMut, DatasetMut, DomError, Holder, MutationRecord, NodeId, Operation, StyleMember,
    StyleMut, Value,
};

use crate::{MutationHook, Primary};

fn record(element: NodeId, holder: Holder, member: &str, args: Vec<Value>) -> MutationRecord {
    MutationRecord::new(element, Operation::nested(holder, member), args)
}

fn string_values<S: AsRef<str>>(tokens: &[S]) -> Vec<Value> {
    tokens.iter().map(|t| Value::from(t.as_ref())).collect()
}

pub struct StyleHandle<'p, H: MutationHook> {
    primary: &'p mut Primary<H>,
    element: NodeId,
}

impl<'p, H: MutationHook> StyleHandle<'p, H> {
    pub(crate) fn new(primary: &'p mut Primary<H>, element: NodeId) -> Self {
        Self { primary, element }
    }

    pub fn set_property(
        &mut self,
        name: &str,
        value: &str,
        priority: Option<&str>,
    ) -> Result<(), DomError> {
        let element = self.element;
        let mut args = vec![Value::from(name), Value::from(value)];
        args.extend(priority.map(Value::from));
        self.primary.intercept(
            record(element, Holder::Style, "setProperty", args),
            |doc| StyleMut::new(doc, element)?.set_property(name, value, priority.unwrap_or("")),
        )
    }

    pub fn remove_property(&mut self, name: &str) -> Result<String, DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Style, "removeProperty", vec![name.into()]),
            |doc| StyleMut::new(doc, element)?.remove_property(name),
        )
    }

    pub fn set_css_text(&mut self, text: &str) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Style, "cssText", vec![text.into()]),
            |doc| StyleMut::new(doc, element)?.set_css_text(text),
        )
    }

    /// `style.<attribute> = value`, e.g. `set("backgroundColor", "red")`.
    pub fn set(&mut self, attribute: &str, value: &str) -> Result<(), DomError> {
        if !StyleMember::is_property_name(attribute) {
            return Err(DomError::Syntax("not a style property name"));
        }
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Style, attribute, vec![value.into()]),
            |doc| StyleMut::new(doc, element)?.set_named(attribute, value),
        )
    }
}

pub struct ClassListHandle<'p, H: MutationHook> {
    primary: &'p mut Primary<H>,
    element: NodeId,
}

impl<'p, H: MutationHook> ClassListHandle<'p, H> {
    pub(crate) fn new(primary: &'p mut Primary<H>, element: NodeId) -> Self {
        Self { primary, element }
    }

    pub fn add<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::ClassList, "add", string_values(tokens)),
            |doc| ClassListMut::new(doc, element)?.add(tokens),
        )
    }

    pub fn remove<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::ClassList, "remove", string_values(tokens)),
            |doc| ClassListMut::new(doc, element)?.remove(tokens),
        )
    }

    pub fn toggle(&mut self, token: &str, force: Option<bool>) -> Result<bool, DomError> {
        let element = self.element;
        let mut args = vec![Value::from(token)];
        args.extend(force.map(Value::Bool));
        self.primary.intercept(
            record(element, Holder::ClassList, "toggle", args),
            |doc| ClassListMut::new(doc, element)?.toggle(token, force),
        )
    }

    pub fn replace(&mut self, old: &str, new: &str) -> Result<bool, DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::ClassList, "replace", vec![old.into(), new.into()]),
            |doc| ClassListMut::new(doc, element)?.replace(old, new),
        )
    }

    pub fn set_value(&mut self, value: &str) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::ClassList, "value", vec![value.into()]),
            |doc| ClassListMut::new(doc, element)?.set_value(value),
        )
    }
}

pub struct DatasetHandle<'p, H: MutationHook> {
    primary: &'p mut Primary<H>,
    element: NodeId,
}

impl<'p, H: MutationHook> DatasetHandle<'p, H> {
    pub(crate) fn new(primary: &'p mut Primary<H>, element: NodeId) -> Self {
        Self { primary, element }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Dataset, key, vec![value.into()]),
            |doc| DatasetMut::new(doc, element)?.set(key, value),
        )
    }

    /// `delete dataset[key]`, reported as an assignment of `null`.
    pub fn delete(&mut self, key: &str) -> Result<bool, DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Dataset, key, vec![Value::Null]),
            |doc| DatasetMut::new(doc, element)?.delete(key),
        )
    }
}

pub struct AttributesHandle<'p, H: MutationHook> {
    primary: &'p mut Primary<H>,
    element: NodeId,
}

impl<'p, H: MutationHook> AttributesHandle<'p, H> {
    pub(crate) fn new(primary: &'p mut Primary<H>, element: NodeId) -> Self {
        Self { primary, element }
    }

    pub fn set_named_item(&mut self, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Attributes, "setNamedItem", vec![name.into(), value.into()]),
            |doc| doc.set_attribute(element, name, value),
        )
    }

    /// Returns the removed value; `NotFound` when absent.
    pub fn remove_named_item(&mut self, name: &str) -> Result<String, DomError> {
        let element = self.element;
        self.primary.intercept(
            record(element, Holder::Attributes, "removeNamedItem", vec![name.into()]),
            |doc| {
                let old = doc
                    .get_attribute(element, name)
                    .map(str::to_string)
                    .ok_or(DomError::NotFound("no attribute with that name"))?;
                doc.remove_attribute(element, name)?;
                Ok(old)
            },
        )
    }
}
