//! `element.dataset`: camelCase keys over `data-*` attributes.
use crate::types::{Document, DomError, NodeId, validate_attribute_name};

/// `fooBar` -> `data-foo-bar`. A `-` followed by a lower-case letter is a syntax
/// error, as in the DOM.
pub fn attribute_for_key(key: &str) -> Result<String, DomError> {
    let bytes = key.as_bytes();
    if bytes
        .windows(2)
        .any(|pair| pair[0] == b'-' && pair[1].is_ascii_lowercase())
    {
        return Err(DomError::Syntax("dataset key has '-' before a lower-case letter"));
    }
    let mut name = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    validate_attribute_name(&name)?;
    Ok(name)
}

/// `data-foo-bar` -> `fooBar`; `None` for attributes outside the dataset.
pub fn key_for_attribute(name: &str) -> Option<String> {
    let rest = name.strip_prefix("data-")?;
    let mut key = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(ch) = chars.next() {
        match chars.peek() {
            Some(next) if ch == '-' && next.is_ascii_lowercase() => {
                key.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => key.push(ch),
        }
    }
    Some(key)
}

#[derive(Clone, Copy)]
pub struct Dataset<'a> {
    doc: &'a Document,
    element: NodeId,
}

impl<'a> Dataset<'a> {
    pub fn new(doc: &'a Document, element: NodeId) -> Self {
        Self { doc, element }
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        let name = attribute_for_key(key).ok()?;
        self.doc.get_attribute(self.element, &name)
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.doc
            .attributes(self.element)
            .iter()
            .filter_map(|(name, value)| key_for_attribute(name).map(|key| (key, value.clone())))
            .collect()
    }
}

pub struct DatasetMut<'a> {
    doc: &'a mut Document,
    element: NodeId,
}

impl<'a> DatasetMut<'a> {
    pub fn new(doc: &'a mut Document, element: NodeId) -> Result<Self, DomError> {
        doc.attributes_mut(element)?;
        Ok(Self { doc, element })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), DomError> {
        let name = attribute_for_key(key)?;
        self.doc.set_attribute(self.element, &name, value)
    }

    /// `delete el.dataset.key`; returns whether an attribute was removed.
    pub fn delete(&mut self, key: &str) -> Result<bool, DomError> {
        let name = attribute_for_key(key)?;
        self.doc.remove_attribute(self.element, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_both_ways() {
        assert_eq!(attribute_for_key("userId").unwrap(), "data-user-id");
        assert_eq!(key_for_attribute("data-user-id").as_deref(), Some("userId"));
        assert_eq!(key_for_attribute("id"), None);
        assert!(matches!(attribute_for_key("user-id"), Err(DomError::Syntax(_))));
    }

    #[test]
    fn set_and_delete_write_data_attributes() {
        let mut doc = Document::parse("<html><body><p data-x=\"1\"></p></body></html>");
        let body = doc.body().unwrap();
        let p = doc.children(body)[0];
        let mut data = DatasetMut::new(&mut doc, p).unwrap();
        data.set("itemCount", "3").unwrap();
        assert!(data.delete("x").unwrap());
        assert!(!data.delete("missing").unwrap());
        assert_eq!(doc.outer_html(p), "<p data-item-count=\"3\"></p>");
        assert_eq!(Dataset::new(&doc, p).get("itemCount"), Some("3"));
    }
}
