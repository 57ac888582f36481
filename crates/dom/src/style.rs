//! `element.style`: an ordered declaration block stored in the `style` attribute.
//!
//! Serialization is `name: value;` or `name: value !important;`, declarations
//! joined by one space. Property names are lower-cased except custom properties
//! (`--*`). Values are not validated.
use crate::types::{Document, DomError, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

pub(crate) fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    for chunk in split_top_level(text) {
        let Some((name, value)) = chunk.split_once(':') else {
            continue;
        };
        let name = normalize_name(name.trim());
        if name.is_empty() {
            continue;
        }
        let mut value = value.trim();
        let mut important = false;
        if let Some(pos) = value.rfind('!')
            && value[pos + 1..].trim().eq_ignore_ascii_case("important")
        {
            important = true;
            value = value[..pos].trim_end();
        }
        if value.is_empty() {
            continue;
        }
        let declaration = Declaration {
            name,
            value: value.to_string(),
            important,
        };
        match out.iter_mut().find(|d| d.name == declaration.name) {
            Some(existing) => *existing = declaration,
            None => out.push(declaration),
        }
    }
    out
}

/// Splits on `;` outside of quotes and parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

pub(crate) fn serialize_declarations(declarations: &[Declaration]) -> String {
    let mut out = String::new();
    for declaration in declarations {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&declaration.name);
        out.push_str(": ");
        out.push_str(&declaration.value);
        if declaration.important {
            out.push_str(" !important");
        }
        out.push(';');
    }
    out
}

fn normalize_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Maps an IDL attribute name (`backgroundColor`, `cssFloat`, `webkitTransform`) or an
/// already dashed name to the CSS property name.
pub fn css_property_name(attribute: &str) -> String {
    if attribute == "cssFloat" {
        return "float".to_string();
    }
    if attribute.contains('-') {
        return normalize_name(attribute);
    }
    let mut out = String::with_capacity(attribute.len() + 4);
    if attribute.starts_with("webkit") {
        out.push('-');
    }
    for ch in attribute.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Read-only view of an element's inline style.
#[derive(Clone, Copy)]
pub struct Style<'a> {
    doc: &'a Document,
    element: NodeId,
}

impl<'a> Style<'a> {
    pub fn new(doc: &'a Document, element: NodeId) -> Self {
        Self { doc, element }
    }

    pub fn declarations(&self) -> Vec<Declaration> {
        self.doc
            .get_attribute(self.element, "style")
            .map(parse_declarations)
            .unwrap_or_default()
    }

    pub fn get_property_value(&self, name: &str) -> String {
        let name = normalize_name(name);
        self.declarations()
            .into_iter()
            .find(|d| d.name == name)
            .map(|d| d.value)
            .unwrap_or_default()
    }

    pub fn get_property_priority(&self, name: &str) -> &'static str {
        let name = normalize_name(name);
        match self.declarations().iter().find(|d| d.name == name) {
            Some(d) if d.important => "important",
            _ => "",
        }
    }

    pub fn css_text(&self) -> String {
        serialize_declarations(&self.declarations())
    }

    pub fn len(&self) -> usize {
        self.declarations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable view of an element's inline style.
pub struct StyleMut<'a> {
    doc: &'a mut Document,
    element: NodeId,
}

impl<'a> StyleMut<'a> {
    pub fn new(doc: &'a mut Document, element: NodeId) -> Result<Self, DomError> {
        doc.attributes_mut(element)?;
        Ok(Self { doc, element })
    }

    fn read(&self) -> Vec<Declaration> {
        Style::new(&*self.doc, self.element).declarations()
    }

    fn write(&mut self, declarations: &[Declaration]) -> Result<(), DomError> {
        self.doc
            .set_attribute(self.element, "style", &serialize_declarations(declarations))
    }

    /// An empty value removes the property. Priorities other than `""` and
    /// `"important"` leave the block untouched.
    pub fn set_property(&mut self, name: &str, value: &str, priority: &str) -> Result<(), DomError> {
        if value.is_empty() {
            self.remove_property(name)?;
            return Ok(());
        }
        let important = match priority {
            "" => false,
            p if p.eq_ignore_ascii_case("important") => true,
            _ => return Ok(()),
        };
        let name = normalize_name(name);
        let mut declarations = self.read();
        let declaration = Declaration {
            name,
            value: value.trim().to_string(),
            important,
        };
        match declarations.iter_mut().find(|d| d.name == declaration.name) {
            Some(existing) => *existing = declaration,
            None => declarations.push(declaration),
        }
        self.write(&declarations)
    }

    /// Returns the removed value, or `""` when the property was absent.
    pub fn remove_property(&mut self, name: &str) -> Result<String, DomError> {
        let name = normalize_name(name);
        let mut declarations = self.read();
        let Some(index) = declarations.iter().position(|d| d.name == name) else {
            return Ok(String::new());
        };
        let removed = declarations.remove(index);
        self.write(&declarations)?;
        Ok(removed.value)
    }

    pub fn set_css_text(&mut self, text: &str) -> Result<(), DomError> {
        let declarations = parse_declarations(text);
        self.write(&declarations)
    }

    /// Assignment through a named property (`style.backgroundColor = v`).
    pub fn set_named(&mut self, attribute: &str, value: &str) -> Result<(), DomError> {
        let name = css_property_name(attribute);
        self.set_property(&name, value, "")
    }
}
