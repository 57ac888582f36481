use crate::types::{Document, NodeId, NodeKind};
use std::fmt::{self, Write};

/// Deterministic tree rendering and structural equality for replication tests.
/// Not a public stable format; intended for test comparisons only.
///
/// Equivalence rules:
/// - Node kinds must match.
/// - Element names must match.
/// - Attribute list order is significant; names and values must match.
/// - Text and comment data must match exactly.
/// - Shadow trees are compared when `compare_shadow` is set.
/// - Document-level preamble (doctype and comments) is compared when
///   `compare_preamble` is set.
#[derive(Clone, Copy, Debug)]
pub struct CompareOptions {
    pub compare_shadow: bool,
    pub compare_preamble: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_shadow: true,
            compare_preamble: false,
        }
    }
}

#[derive(Debug)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

impl TreeSnapshot {
    pub fn new(doc: &Document, node: NodeId, options: CompareOptions) -> Self {
        let mut lines = Vec::new();
        walk(doc, node, &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

fn walk(doc: &Document, node: NodeId, options: &CompareOptions, depth: usize, out: &mut Vec<String>) {
    crate::json::with_stack(|| walk_level(doc, node, options, depth, out))
}

fn walk_level(
    doc: &Document,
    node: NodeId,
    options: &CompareOptions,
    depth: usize,
    out: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let mut line = indent.clone();
    let _ = write!(line, "{}", describe(doc, node));
    out.push(line);
    for child in compared_children(doc, node, options) {
        walk(doc, child, options, depth + 1, out);
    }
    if options.compare_shadow
        && let Some(shadow) = doc.shadow_root(node)
    {
        out.push(format!("{indent}  #shadow-root"));
        for &child in doc.children(shadow) {
            walk(doc, child, options, depth + 2, out);
        }
    }
}

fn describe(doc: &Document, node: NodeId) -> String {
    match doc.kind(node) {
        Some(NodeKind::Document { doctype }) => match doctype {
            Some(doctype) => format!("#document <!DOCTYPE {doctype}>"),
            None => "#document".to_string(),
        },
        Some(NodeKind::Element {
            name, attributes, ..
        }) => {
            let mut out = format!("<{name}");
            for (key, value) in attributes {
                let _ = write!(out, " {key}={value:?}");
            }
            out.push('>');
            out
        }
        Some(NodeKind::Text { text }) => format!("#text {text:?}"),
        Some(NodeKind::Comment { text }) => format!("#comment {text:?}"),
        Some(NodeKind::ShadowRoot { .. }) => "#shadow-root".to_string(),
        None => "#missing".to_string(),
    }
}

fn compared_children(doc: &Document, node: NodeId, options: &CompareOptions) -> Vec<NodeId> {
    if doc.is_document(node) && !options.compare_preamble {
        doc.element_children(node).collect()
    } else {
        doc.children(node).to_vec()
    }
}

#[derive(Debug)]
pub struct DomMismatch {
    path: String,
    detail: String,
    expected: String,
    actual: String,
    expected_subtree: String,
    actual_subtree: String,
}

impl fmt::Display for DomMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DOM mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected: {}", self.expected)?;
        writeln!(f, "actual:   {}", self.actual)?;
        writeln!(f, "expected subtree:\n{}", self.expected_subtree)?;
        writeln!(f, "actual subtree:\n{}", self.actual_subtree)?;
        Ok(())
    }
}

impl std::error::Error for DomMismatch {}

struct Side<'a> {
    doc: &'a Document,
    node: NodeId,
}

pub fn assert_dom_eq(expected: &Document, actual: &Document, options: CompareOptions) {
    if let Err(mismatch) = compare_dom(expected, expected.root(), actual, actual.root(), options) {
        panic!("{mismatch}");
    }
}

pub fn compare_dom(
    expected_doc: &Document,
    expected: NodeId,
    actual_doc: &Document,
    actual: NodeId,
    options: CompareOptions,
) -> Result<(), Box<DomMismatch>> {
    let mut path = Vec::new();
    compare_nodes(
        &Side {
            doc: expected_doc,
            node: expected,
        },
        &Side {
            doc: actual_doc,
            node: actual,
        },
        &options,
        &mut path,
    )
}

fn compare_nodes(
    expected: &Side<'_>,
    actual: &Side<'_>,
    options: &CompareOptions,
    path: &mut Vec<String>,
) -> Result<(), Box<DomMismatch>> {
    crate::json::with_stack(|| compare_level(expected, actual, options, path))
}

fn compare_level(
    expected: &Side<'_>,
    actual: &Side<'_>,
    options: &CompareOptions,
    path: &mut Vec<String>,
) -> Result<(), Box<DomMismatch>> {
    path.push(describe(expected.doc, expected.node));
    let (Some(expected_kind), Some(actual_kind)) =
        (expected.doc.kind(expected.node), actual.doc.kind(actual.node))
    else {
        return Err(mismatch(path, "missing node", expected, actual, options));
    };
    match (expected_kind, actual_kind) {
        (
            NodeKind::Document {
                doctype: expected_doctype,
            },
            NodeKind::Document {
                doctype: actual_doctype,
            },
        ) => {
            if options.compare_preamble && expected_doctype != actual_doctype {
                return Err(mismatch(path, "doctype", expected, actual, options));
            }
        }
        (
            NodeKind::Element {
                name: expected_name,
                attributes: expected_attrs,
                ..
            },
            NodeKind::Element {
                name: actual_name,
                attributes: actual_attrs,
                ..
            },
        ) => {
            if expected_name != actual_name {
                return Err(mismatch(path, "element name", expected, actual, options));
            }
            if expected_attrs != actual_attrs {
                return Err(mismatch(path, "attributes", expected, actual, options));
            }
        }
        (NodeKind::Text { text: e }, NodeKind::Text { text: a })
        | (NodeKind::Comment { text: e }, NodeKind::Comment { text: a }) => {
            if e != a {
                return Err(mismatch(path, "character data", expected, actual, options));
            }
        }
        (NodeKind::ShadowRoot { .. }, NodeKind::ShadowRoot { .. }) => {}
        _ => return Err(mismatch(path, "node kind", expected, actual, options)),
    }

    let expected_children = compared_children(expected.doc, expected.node, options);
    let actual_children = compared_children(actual.doc, actual.node, options);
    if expected_children.len() != actual_children.len() {
        return Err(mismatch(path, "child count", expected, actual, options));
    }
    for (&e, &a) in expected_children.iter().zip(actual_children.iter()) {
        compare_nodes(
            &Side {
                doc: expected.doc,
                node: e,
            },
            &Side {
                doc: actual.doc,
                node: a,
            },
            options,
            path,
        )?;
    }
    if options.compare_shadow {
        match (
            expected.doc.shadow_root(expected.node),
            actual.doc.shadow_root(actual.node),
        ) {
            (None, None) => {}
            (Some(e), Some(a)) => compare_nodes(
                &Side {
                    doc: expected.doc,
                    node: e,
                },
                &Side {
                    doc: actual.doc,
                    node: a,
                },
                options,
                path,
            )?,
            _ => return Err(mismatch(path, "shadow root presence", expected, actual, options)),
        }
    }
    path.pop();
    Ok(())
}

fn mismatch(
    path: &[String],
    detail: &str,
    expected: &Side<'_>,
    actual: &Side<'_>,
    options: &CompareOptions,
) -> Box<DomMismatch> {
    Box::new(DomMismatch {
        path: path.join(" > "),
        detail: detail.to_string(),
        expected: describe(expected.doc, expected.node),
        actual: describe(actual.doc, actual.node),
        expected_subtree: TreeSnapshot::new(expected.doc, expected.node, *options).render(),
        actual_subtree: TreeSnapshot::new(actual.doc, actual.node, *options).render(),
    })
}
