//! `element.classList`: an ordered token set over the `class` attribute.
//!
//! Mutations run the DOM update steps: the attribute is rewritten with the
//! deduplicated tokens joined by single spaces. A `class` attribute that is absent
//! and stays empty is not created.
use crate::types::{Document, DomError, NodeId};

fn tokens(value: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in value.split_ascii_whitespace() {
        if !out.iter().any(|t| t == token) {
            out.push(token.to_string());
        }
    }
    out
}

fn validate(token: &str) -> Result<(), DomError> {
    if token.is_empty() {
        return Err(DomError::Syntax("class token is empty"));
    }
    if token.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(DomError::InvalidCharacter(token.to_string()));
    }
    Ok(())
}

#[derive(Clone, Copy)]
pub struct ClassList<'a> {
    doc: &'a Document,
    element: NodeId,
}

impl<'a> ClassList<'a> {
    pub fn new(doc: &'a Document, element: NodeId) -> Self {
        Self { doc, element }
    }

    pub fn tokens(&self) -> Vec<String> {
        tokens(self.doc.get_attribute(self.element, "class").unwrap_or_default())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| t == token)
    }

    pub fn value(&self) -> String {
        self.doc
            .get_attribute(self.element, "class")
            .unwrap_or_default()
            .to_string()
    }
}

pub struct ClassListMut<'a> {
    doc: &'a mut Document,
    element: NodeId,
}

impl<'a> ClassListMut<'a> {
    pub fn new(doc: &'a mut Document, element: NodeId) -> Result<Self, DomError> {
        doc.attributes_mut(element)?;
        Ok(Self { doc, element })
    }

    fn read(&self) -> Vec<String> {
        ClassList::new(&*self.doc, self.element).tokens()
    }

    fn update(&mut self, tokens: &[String]) -> Result<(), DomError> {
        if tokens.is_empty() && self.doc.get_attribute(self.element, "class").is_none() {
            return Ok(());
        }
        self.doc
            .set_attribute(self.element, "class", &tokens.join(" "))
    }

    pub fn add<S: AsRef<str>>(&mut self, new_tokens: &[S]) -> Result<(), DomError> {
        for token in new_tokens {
            validate(token.as_ref())?;
        }
        let mut current = self.read();
        for token in new_tokens {
            let token = token.as_ref();
            if !current.iter().any(|t| t == token) {
                current.push(token.to_string());
            }
        }
        self.update(&current)
    }

    pub fn remove<S: AsRef<str>>(&mut self, old_tokens: &[S]) -> Result<(), DomError> {
        for token in old_tokens {
            validate(token.as_ref())?;
        }
        let mut current = self.read();
        current.retain(|t| !old_tokens.iter().any(|old| old.as_ref() == t));
        self.update(&current)
    }

    /// Returns whether the token is present afterwards.
    pub fn toggle(&mut self, token: &str, force: Option<bool>) -> Result<bool, DomError> {
        validate(token)?;
        let mut current = self.read();
        let present = current.iter().any(|t| t == token);
        match (present, force) {
            (true, None | Some(false)) => {
                current.retain(|t| t != token);
                self.update(&current)?;
                Ok(false)
            }
            (false, None | Some(true)) => {
                current.push(token.to_string());
                self.update(&current)?;
                Ok(true)
            }
            (true, Some(true)) => Ok(true),
            (false, Some(false)) => Ok(false),
        }
    }

    /// Returns whether `old` was present and replaced.
    pub fn replace(&mut self, old: &str, new: &str) -> Result<bool, DomError> {
        validate(old)?;
        validate(new)?;
        let mut current = self.read();
        let Some(index) = current.iter().position(|t| t == old) else {
            return Ok(false);
        };
        if current.iter().any(|t| t == new) {
            current.remove(index);
            // `new` may have been before `old`; both land on the earlier slot.
        } else {
            current[index] = new.to_string();
        }
        self.update(&current)?;
        Ok(true)
    }

    /// `classList.value = v` sets the attribute verbatim.
    pub fn set_value(&mut self, value: &str) -> Result<(), DomError> {
        self.doc.set_attribute(self.element, "class", value)
    }
}
