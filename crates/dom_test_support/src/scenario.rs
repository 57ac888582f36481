//! Scripted primary mutations described in TOML.
//!
//! ```toml
//! name = "counter"
//! markup = "<html><body><p>0</p></body></html>"
//! expected = "<html><body><p>1</p></body></html>"
//!
//! [[step]]
//! target = [0, 1, 0]
//! op = "textContent"
//! args = ["1"]
//! checkpoint = true
//! ```
//!
//! Arguments are TOML literals, `{ path = [..] }` for a node already in the
//! primary tree, `{ new = "<markup>" }` for a freshly created detached node, or
//! `{ null = true }`.
use std::fs;
use std::path::{Path, PathBuf};

use dom::{Document, InvokeError, NodeId, NodePath, Operation, Value, resolve};
use primary::{MutationHook, Primary};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub markup: String,
    /// Replica markup expected after the last step.
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    #[serde(default)]
    pub target: Vec<u32>,
    #[serde(default)]
    pub op: Option<Operation>,
    #[serde(default)]
    pub args: Vec<StepArg>,
    /// Swap the whole primary document for this markup before the operation.
    #[serde(default)]
    pub replace_root: Option<String>,
    /// The operation is expected to fail on the primary.
    #[serde(default)]
    pub fails: bool,
    #[serde(default)]
    pub checkpoint: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum StepArg {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Path { path: Vec<u32> },
    New { new: String },
    Null { null: bool },
}

impl Scenario {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: &Path) -> Self {
        let source = fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("failed to read scenario {path:?}: {err}"));
        Self::from_toml(&source).unwrap_or_else(|err| panic!("invalid scenario {path:?}: {err}"))
    }

    pub fn document(&self) -> Document {
        Document::parse(&self.markup)
    }
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn load_fixture(name: &str) -> Scenario {
    Scenario::load(&fixtures_dir().join(format!("{name}.toml")))
}

/// Every `*.toml` fixture, sorted by file name.
pub fn all_fixtures() -> Vec<Scenario> {
    let dir = fixtures_dir();
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .unwrap_or_else(|err| panic!("failed to list {dir:?}: {err}"))
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    paths.iter().map(|path| Scenario::load(path)).collect()
}

/// Runs every step against `primary`. Panics when a step's paths do not resolve
/// or its outcome contradicts `fails`, since both mean the fixture is wrong.
pub fn run_steps<H: MutationHook>(primary: &mut Primary<H>, scenario: &Scenario) {
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = run_step(primary, step);
        let context = format!("{} step {index}", scenario.name);
        match (outcome, step.fails) {
            (Some(Ok(_)), true) => panic!("{context}: expected the operation to fail"),
            (Some(Err(err)), false) => panic!("{context}: {err}"),
            _ => {}
        }
    }
}

/// Runs one step; `None` when the step carries no operation.
pub fn run_step<H: MutationHook>(
    primary: &mut Primary<H>,
    step: &Step,
) -> Option<Result<Value, InvokeError>> {
    if let Some(markup) = &step.replace_root {
        primary.root().replace(Document::parse(markup));
    }
    let outcome = step.op.as_ref().map(|op| {
        let target = resolve_in_primary(primary, &step.target);
        let args = step
            .args
            .iter()
            .map(|arg| step_value(primary, arg))
            .collect();
        primary.perform(target, op.clone(), args)
    });
    if step.checkpoint {
        primary.checkpoint();
    }
    outcome
}

fn resolve_in_primary<H: MutationHook>(primary: &Primary<H>, path: &[u32]) -> NodeId {
    let path = NodePath(path.to_vec());
    primary
        .read(|doc| resolve(doc, doc.root(), &path))
        .unwrap_or_else(|| panic!("path {path} does not resolve in the primary"))
}

fn step_value<H: MutationHook>(primary: &mut Primary<H>, arg: &StepArg) -> Value {
    match arg {
        StepArg::Bool(b) => Value::Bool(*b),
        StepArg::Integer(n) => Value::Number(*n as f64),
        StepArg::Float(n) => Value::Number(*n),
        StepArg::String(s) => Value::String(s.clone()),
        StepArg::Path { path } => Value::Node(resolve_in_primary(primary, path)),
        StepArg::New { new } => match primary.create_fragment(new).as_slice() {
            [node] => Value::Node(*node),
            nodes => panic!("{new:?} must parse to exactly one node, got {}", nodes.len()),
        },
        StepArg::Null { .. } => Value::Null,
    }
}
