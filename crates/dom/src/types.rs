//! Arena-backed document tree.
//!
//! Contract:
//! - Every node lives in the arena of exactly one `Document` and is addressed by a
//!   `NodeId` that is only meaningful for that document.
//! - A node has at most one parent; children are ordered.
//! - Removed nodes stay allocated (detached) so callers may re-insert them, as with
//!   the DOM's garbage-collected nodes. An owner that holds no `NodeId`s across
//!   calls can reclaim them with `compact`.
//! - A shadow root has no parent; it is reachable from its host element only.
//! - Element and attribute names are stored ASCII-lowercase.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        shadow_root: Option<NodeId>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    ShadowRoot {
        host: NodeId,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Document { .. } => "document",
            NodeKind::Element { .. } => "element",
            NodeKind::Text { .. } => "text",
            NodeKind::Comment { .. } => "comment",
            NodeKind::ShadowRoot { .. } => "shadow-root",
        }
    }

    fn allows_children(&self) -> bool {
        matches!(
            self,
            NodeKind::Document { .. } | NodeKind::Element { .. } | NodeKind::ShadowRoot { .. }
        )
    }
}

/// Error names follow the DOMException names an application would observe.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("NotFoundError: {0}")]
    NotFound(&'static str),
    #[error("HierarchyRequestError: {0}")]
    HierarchyRequest(&'static str),
    #[error("InvalidCharacterError: {0:?}")]
    InvalidCharacter(String),
    #[error("SyntaxError: {0}")]
    Syntax(&'static str),
    #[error("NotSupportedError: {0}")]
    NotSupported(&'static str),
    #[error("operation not supported on a {kind} node")]
    WrongNodeKind { kind: &'static str },
}

/// Argument of the variadic insertion methods (`before`, `after`, `append`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildItem {
    Node(NodeId),
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeRecord>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                kind: NodeKind::Document { doctype: None },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doctype(&self) -> Option<&str> {
        match &self.nodes[self.root.0 as usize].kind {
            NodeKind::Document { doctype } => doctype.as_deref(),
            _ => None,
        }
    }

    pub fn set_doctype(&mut self, value: Option<String>) {
        if let NodeKind::Document { doctype } = &mut self.nodes[self.root.0 as usize].kind {
            *doctype = value;
        }
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).next()
    }

    /// The first `<body>` child of the document element.
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|&child| self.tag_name(child) == Some("body"))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn record(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, DomError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0 as usize).map(|record| &record.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0 as usize).and_then(|record| record.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0 as usize)
            .map(|record| record.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Document { .. }))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Character data of a text or comment node.
    pub fn data(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text { text }) | Some(NodeKind::Comment { text }) => Some(text),
            _ => None,
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        fn walk(doc: &Document, id: NodeId, out: &mut String) {
            crate::json::with_stack(|| match doc.kind(id) {
                Some(NodeKind::Text { text }) => out.push_str(text),
                Some(NodeKind::Element { .. }) | Some(NodeKind::ShadowRoot { .. }) => {
                    for &child in doc.children(id) {
                        walk(doc, child, out);
                    }
                }
                _ => {}
            })
        }
        match self.kind(id) {
            Some(NodeKind::Comment { text }) => text.clone(),
            _ => {
                let mut out = String::new();
                walk(self, id, &mut out);
                out
            }
        }
    }

    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            Some(NodeKind::Element { shadow_root, .. }) => *shadow_root,
            _ => None,
        }
    }

    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            Some(NodeKind::ShadowRoot { host }) => Some(*host),
            _ => None,
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Inclusive ancestry through parent links only.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Inclusive ancestry that also crosses from a shadow root to its host.
    pub fn host_including_contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id).or_else(|| self.host(id));
        }
        false
    }

    /// Whether `node` is reachable from the document root through parent links.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Whether `node` hangs off the document, possibly through shadow hosts.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.host_including_contains(self.root, node)
    }

    /// Drops every node that cannot be reached from the root, shadow trees being
    /// reachable through their hosts, and renumbers the survivors in allocation
    /// order. Returns how many nodes were reclaimed. Every `NodeId` obtained before
    /// the call is invalidated.
    pub fn compact(&mut self) -> usize {
        let mut live = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(seen) = live.get_mut(id.0 as usize) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            let record = &self.nodes[id.0 as usize];
            stack.extend(record.children.iter().copied());
            if let NodeKind::Element {
                shadow_root: Some(shadow),
                ..
            } = &record.kind
            {
                stack.push(*shadow);
            }
        }

        let before = self.nodes.len();
        let mut next = 0;
        let renumbered: Vec<Option<NodeId>> = live
            .iter()
            .map(|&keep| {
                keep.then(|| {
                    next += 1;
                    NodeId(next - 1)
                })
            })
            .collect();
        let map = |id: NodeId| renumbered.get(id.0 as usize).copied().flatten();

        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .zip(&live)
            .filter(|(_, keep)| **keep)
            .map(|(mut record, _)| {
                record.parent = record.parent.and_then(map);
                record.children = record.children.iter().filter_map(|&child| map(child)).collect();
                match &mut record.kind {
                    NodeKind::Element { shadow_root, .. } => *shadow_root = shadow_root.and_then(map),
                    NodeKind::ShadowRoot { host } => {
                        if let Some(renumbered) = map(*host) {
                            *host = renumbered;
                        }
                    }
                    _ => {}
                }
                record
            })
            .collect();
        self.root = map(self.root).unwrap_or(NodeId(0));
        before - self.nodes.len()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        validate_element_name(name)?;
        Ok(self.alloc(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
            shadow_root: None,
        }))
    }

    pub fn create_text_node(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text { text: text.into() })
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment { text: text.into() })
    }

    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        match &self.record(host)?.kind {
            NodeKind::Element { shadow_root: None, .. } => {}
            NodeKind::Element { .. } => {
                return Err(DomError::NotSupported("element already hosts a shadow root"));
            }
            other => return Err(DomError::WrongNodeKind { kind: other.label() }),
        }
        let shadow = self.alloc(NodeKind::ShadowRoot { host });
        if let NodeKind::Element { shadow_root, .. } = &mut self.record_mut(host)?.kind {
            *shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    fn ensure_pre_insertion_validity(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_kind = &self.record(parent)?.kind;
        if !parent_kind.allows_children() {
            return Err(DomError::HierarchyRequest("parent cannot have children"));
        }
        let node_kind = &self.record(node)?.kind;
        if self.host_including_contains(node, parent) {
            return Err(DomError::HierarchyRequest(
                "node is an inclusive ancestor of the parent",
            ));
        }
        if let Some(child) = child
            && self.parent(child) != Some(parent)
        {
            return Err(DomError::NotFound("reference node is not a child of the parent"));
        }
        match node_kind {
            NodeKind::Document { .. } | NodeKind::ShadowRoot { .. } => {
                return Err(DomError::HierarchyRequest("node cannot be inserted"));
            }
            NodeKind::Text { .. } if matches!(parent_kind, NodeKind::Document { .. }) => {
                return Err(DomError::HierarchyRequest("documents cannot hold text"));
            }
            NodeKind::Element { .. } if matches!(parent_kind, NodeKind::Document { .. }) => {
                if self
                    .element_children(parent)
                    .any(|existing| existing != node && Some(existing) != child)
                {
                    return Err(DomError::HierarchyRequest(
                        "document already has a document element",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(record) = self.nodes.get_mut(parent.0 as usize) {
            record.children.retain(|&child| child != node);
        }
        if let Some(record) = self.nodes.get_mut(node.0 as usize) {
            record.parent = None;
        }
    }

    fn insert_at(&mut self, parent: NodeId, node: NodeId, index: usize) {
        let children = &mut self.nodes[parent.0 as usize].children;
        let index = index.min(children.len());
        children.insert(index, node);
        self.nodes[node.0 as usize].parent = Some(parent);
    }

    fn insert_before_unchecked(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.detach(node);
        let index = reference
            .and_then(|reference| self.children(parent).iter().position(|&c| c == reference))
            .unwrap_or(self.children(parent).len());
        self.insert_at(parent, node, index);
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        self.ensure_pre_insertion_validity(parent, node, child)?;
        let reference = if child == Some(node) {
            self.next_sibling(node)
        } else {
            child
        };
        self.insert_before_unchecked(parent, node, reference);
        Ok(node)
    }

    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<NodeId, DomError> {
        self.insert_before(parent, node, None)
    }

    /// Replaces `child` with `node` and returns `child`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: NodeId,
    ) -> Result<NodeId, DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotFound("replaced node is not a child of the parent"));
        }
        self.ensure_pre_insertion_validity(parent, node, Some(child))?;
        if node == child {
            return Ok(child);
        }
        self.detach(node);
        let index = self
            .index_in_parent(child)
            .ok_or(DomError::NotFound("replaced node is not a child of the parent"))?;
        self.detach(child);
        self.insert_at(parent, node, index);
        Ok(child)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.record(parent)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotFound("node is not a child of the parent"));
        }
        self.detach(child);
        Ok(child)
    }

    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.record(node)?;
        self.detach(node);
        Ok(())
    }

    /// Turns variadic arguments into nodes, creating text nodes for strings.
    fn materialize_items(&mut self, items: Vec<ChildItem>) -> Result<Vec<NodeId>, DomError> {
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ChildItem::Node(id) => {
                    self.record(id)?;
                    nodes.push(id);
                }
                ChildItem::Text(text) => nodes.push(self.create_text_node(text)),
            }
        }
        Ok(nodes)
    }

    fn insert_all(
        &mut self,
        parent: NodeId,
        nodes: &[NodeId],
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        for &node in nodes {
            self.ensure_pre_insertion_validity(parent, node, None)?;
        }
        for &node in nodes {
            self.insert_before_unchecked(parent, node, reference);
        }
        Ok(())
    }

    pub fn before(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        self.record(node)?;
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let nodes = self.materialize_items(items)?;
        let index = self.index_in_parent(node).unwrap_or(0);
        let viable_previous = self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|sibling| !nodes.contains(sibling));
        let reference = match viable_previous {
            Some(previous) => {
                let position = self.index_in_parent(previous).unwrap_or(0);
                self.children(parent)
                    .iter()
                    .skip(position + 1)
                    .copied()
                    .find(|sibling| !nodes.contains(sibling))
            }
            None => self
                .children(parent)
                .iter()
                .copied()
                .find(|sibling| !nodes.contains(sibling)),
        };
        self.insert_all(parent, &nodes, reference)
    }

    pub fn after(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        self.record(node)?;
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let nodes = self.materialize_items(items)?;
        let reference = self.viable_next_sibling(node, &nodes);
        self.insert_all(parent, &nodes, reference)
    }

    pub fn replace_with(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        self.record(node)?;
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let nodes = self.materialize_items(items)?;
        for &item in &nodes {
            self.ensure_pre_insertion_validity(parent, item, None)?;
        }
        let reference = self.viable_next_sibling(node, &nodes);
        if !nodes.contains(&node) {
            self.detach(node);
        }
        for &item in &nodes {
            self.insert_before_unchecked(parent, item, reference);
        }
        Ok(())
    }

    fn viable_next_sibling(&self, node: NodeId, excluded: &[NodeId]) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        self.children(parent)
            .iter()
            .skip(index + 1)
            .copied()
            .find(|sibling| !excluded.contains(sibling))
    }

    pub fn append(&mut self, parent: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let nodes = self.materialize_items(items)?;
        self.insert_all(parent, &nodes, None)
    }

    pub fn prepend(&mut self, parent: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let nodes = self.materialize_items(items)?;
        let reference = self
            .children(parent)
            .iter()
            .copied()
            .find(|child| !nodes.contains(child));
        self.insert_all(parent, &nodes, reference)
    }

    fn clear_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.record_mut(parent)?.children);
        for child in children {
            self.nodes[child.0 as usize].parent = None;
        }
        Ok(())
    }

    /// `None` behaves like the empty string, as assigning `null` does in the DOM.
    pub fn set_text_content(&mut self, node: NodeId, value: Option<&str>) -> Result<(), DomError> {
        let value = value.unwrap_or_default();
        match &mut self.record_mut(node)?.kind {
            NodeKind::Text { text } | NodeKind::Comment { text } => {
                *text = value.to_string();
                Ok(())
            }
            NodeKind::Element { .. } | NodeKind::ShadowRoot { .. } => {
                self.clear_children(node)?;
                if !value.is_empty() {
                    let text = self.create_text_node(value);
                    self.insert_at(node, text, 0);
                }
                Ok(())
            }
            NodeKind::Document { .. } => Ok(()),
        }
    }

    /// Setting the node value of anything but character data is a no-op.
    pub fn set_node_value(&mut self, node: NodeId, value: Option<&str>) -> Result<(), DomError> {
        if let NodeKind::Text { text } | NodeKind::Comment { text } = &mut self.record_mut(node)?.kind
        {
            *text = value.unwrap_or_default().to_string();
        }
        Ok(())
    }

    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) -> Result<(), DomError> {
        match &self.record(node)?.kind {
            NodeKind::Element { .. } | NodeKind::ShadowRoot { .. } => {}
            other => return Err(DomError::WrongNodeKind { kind: other.label() }),
        }
        let fragment = crate::builder::parse_fragment(self, markup);
        self.clear_children(node)?;
        for child in fragment {
            let index = self.children(node).len();
            self.insert_at(node, child, index);
        }
        Ok(())
    }

    pub(crate) fn attributes_mut(
        &mut self,
        element: NodeId,
    ) -> Result<&mut Vec<(String, String)>, DomError> {
        match &mut self.record_mut(element)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            other => Err(DomError::WrongNodeKind { kind: other.label() }),
        }
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        validate_attribute_name(name)?;
        let name = name.to_ascii_lowercase();
        let attributes = self.attributes_mut(element)?;
        match attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    /// Returns whether an attribute was removed.
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<bool, DomError> {
        let name = name.to_ascii_lowercase();
        let attributes = self.attributes_mut(element)?;
        let before = attributes.len();
        attributes.retain(|(key, _)| *key != name);
        Ok(attributes.len() != before)
    }

    pub fn toggle_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        force: Option<bool>,
    ) -> Result<bool, DomError> {
        validate_attribute_name(name)?;
        let present = self.attributes_mut(element)?.iter().any(|(key, _)| key.eq_ignore_ascii_case(name));
        match (present, force) {
            (false, None | Some(true)) => {
                self.set_attribute(element, name, "")?;
                Ok(true)
            }
            (false, Some(false)) => Ok(false),
            (true, None | Some(false)) => {
                self.remove_attribute(element, name)?;
                Ok(false)
            }
            (true, Some(true)) => Ok(true),
        }
    }

    pub fn set_id(&mut self, element: NodeId, value: &str) -> Result<(), DomError> {
        self.set_attribute(element, "id", value)
    }

    pub fn set_class_name(&mut self, element: NodeId, value: &str) -> Result<(), DomError> {
        self.set_attribute(element, "class", value)
    }
}

fn validate_element_name(name: &str) -> Result<(), DomError> {
    let mut bytes = name.bytes();
    let valid = matches!(bytes.next(), Some(first) if first.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(DomError::InvalidCharacter(name.to_string()))
    }
}

pub(crate) fn validate_attribute_name(name: &str) -> Result<(), DomError> {
    let valid = !name.is_empty()
        && !name
            .bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b'\0' | b'"' | b'\'' | b'>' | b'/' | b'='));
    if valid {
        Ok(())
    } else {
        Err(DomError::InvalidCharacter(name.to_string()))
    }
}
