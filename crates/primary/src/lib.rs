//! The primary side: an intercepting decorator over the live document.
//!
//! Application code mutates the primary tree only through `Primary`. Every
//! allow-listed operation is one method that builds a `MutationRecord`, lets the
//! installed hook capture it against the pre-mutation tree, runs the real
//! operation and reports according to the `ReportPolicy`.
//!
//! Contract:
//! - At most one hook is installed; a second `install` is a logged no-op.
//! - Only mutations whose target is attached to the current root are captured.
//!   When such a mutation moves attached argument nodes out of the live tree,
//!   each departure is reported as a `remove` after the operation succeeds,
//!   under either policy.
//! - Node creation is not a mutation of the live tree and is never reported.
//! - Under report-after a failed operation reports nothing. Under report-before
//!   the report is already out when the operation runs, so a failing operation
//!   still produces a patch and observers reading the primary during `report`
//!   see the pre-mutation tree.
use core_types::{Generation, ReportPolicy};
use dom::{
    ChildItem, Document, DomError, InvokeError, MutationRecord, NodeId, NodeMember, NodePath,
    Operation, Value, invoke, parse_fragment, path_of,
};

mod config;
mod eval;
mod handles;
mod hook;
mod root;

pub use config::{InterceptConfig, REPORT_BEFORE_ENV};
pub use eval::{EvalError, evaluate, serve_eval, spawn_eval_server};
pub use handles::{AttributesHandle, ClassListHandle, DatasetHandle, StyleHandle};
pub use hook::{MutationHook, PatchRecorder};
pub use root::RootHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

struct Installed<H> {
    hook: H,
    policy: ReportPolicy,
    generation: Generation,
}

pub struct Primary<H: MutationHook> {
    root: RootHandle,
    installed: Option<Installed<H>>,
}

impl<H: MutationHook> Primary<H> {
    pub fn new(root: RootHandle) -> Self {
        Self {
            root,
            installed: None,
        }
    }

    pub fn install(&mut self, config: InterceptConfig, hook: H) -> InstallOutcome {
        if self.installed.is_some() {
            log::debug!(target: "mirror.intercept", "interceptor already installed; ignoring");
            return InstallOutcome::AlreadyInstalled;
        }
        let generation = self.root.generation();
        log::debug!(
            target: "mirror.intercept",
            "interceptor installed ({:?}, generation {})",
            config.policy,
            generation.0
        );
        self.installed = Some(Installed {
            hook,
            policy: config.policy,
            generation,
        });
        InstallOutcome::Installed
    }

    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    pub fn root(&self) -> &RootHandle {
        &self.root
    }

    pub fn hook(&self) -> Option<&H> {
        self.installed.as_ref().map(|installed| &installed.hook)
    }

    pub fn hook_mut(&mut self) -> Option<&mut H> {
        self.installed.as_mut().map(|installed| &mut installed.hook)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.root.read())
    }

    /// Marks a step boundary; the hook forwards it as a checkpoint signal.
    pub fn checkpoint(&mut self) {
        if let Some(installed) = self.installed.as_mut() {
            installed.hook.checkpoint();
        }
    }

    /// Runs `op` with interception around it.
    pub(crate) fn intercept<R, E>(
        &mut self,
        record: MutationRecord,
        op: impl FnOnce(&mut Document) -> Result<R, E>,
    ) -> Result<R, E> {
        let root = self.root.clone();
        let mut state = root.state_mut();
        let Some(installed) = self.installed.as_mut() else {
            return op(&mut state.document);
        };
        if installed.generation != state.generation {
            log::info!(
                target: "mirror.intercept",
                "root swap detected (generation {} -> {}); re-arming",
                installed.generation.0,
                state.generation.0
            );
            installed.generation = state.generation;
            installed.hook.rearmed(&state.document);
        }
        if !state.document.is_attached(record.target) {
            let departures = capture_departures(&mut installed.hook, &state.document, &record);
            let result = op(&mut state.document);
            if result.is_ok() {
                for (node, report) in departures {
                    if !state.document.is_attached(node) {
                        installed.hook.report(report);
                    }
                }
            }
            return result;
        }
        let report = installed.hook.capture(&state.document, &record);
        match (installed.policy, report) {
            (ReportPolicy::ReportBefore, Some(report)) => {
                installed.hook.report(report);
                op(&mut state.document)
            }
            (ReportPolicy::ReportAfter, Some(report)) => {
                let result = op(&mut state.document);
                if result.is_ok() {
                    installed.hook.report(report);
                } else {
                    log::trace!(
                        target: "mirror.intercept",
                        "{} failed on the primary; not reporting",
                        record.operation
                    );
                }
                result
            }
            (_, None) => op(&mut state.document),
        }
    }

    fn node_op<R>(
        &mut self,
        target: NodeId,
        member: NodeMember,
        args: Vec<Value>,
        op: impl FnOnce(&mut Document) -> Result<R, DomError>,
    ) -> Result<R, DomError> {
        self.intercept(MutationRecord::new(target, member, args), op)
    }

    /// Dynamic seam: performs any operation of the shared vocabulary.
    pub fn perform(
        &mut self,
        target: NodeId,
        operation: Operation,
        args: Vec<Value>,
    ) -> Result<Value, InvokeError> {
        operation.resolve()?;
        let record = MutationRecord {
            target,
            operation: operation.clone(),
            args: args.clone(),
        };
        self.intercept(record, |doc| invoke(doc, target, &operation, args))
    }

    pub fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        self.root.state_mut().document.create_element(name)
    }

    pub fn create_text_node(&mut self, text: impl Into<String>) -> NodeId {
        self.root.state_mut().document.create_text_node(text)
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.root.state_mut().document.create_comment(text)
    }

    /// Parses `markup` into detached nodes owned by the primary document.
    pub fn create_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        parse_fragment(&mut self.root.state_mut().document, markup)
    }

    /// Shadow roots are created empty; their content is carried by snapshots.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        self.root.state_mut().document.attach_shadow(host)
    }

    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<NodeId, DomError> {
        self.node_op(parent, NodeMember::AppendChild, vec![node.into()], |doc| {
            doc.append_child(parent, node)
        })
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        self.node_op(
            parent,
            NodeMember::InsertBefore,
            vec![node.into(), child.into()],
            |doc| doc.insert_before(parent, node, child),
        )
    }

    pub fn replace_child(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: NodeId,
    ) -> Result<NodeId, DomError> {
        self.node_op(
            parent,
            NodeMember::ReplaceChild,
            vec![node.into(), child.into()],
            |doc| doc.replace_child(parent, node, child),
        )
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.node_op(parent, NodeMember::RemoveChild, vec![child.into()], |doc| {
            doc.remove_child(parent, child)
        })
    }

    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.node_op(node, NodeMember::Remove, Vec::new(), |doc| doc.remove(node))
    }

    pub fn before(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let args = item_values(&items);
        self.node_op(node, NodeMember::Before, args, |doc| doc.before(node, items))
    }

    pub fn after(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let args = item_values(&items);
        self.node_op(node, NodeMember::After, args, |doc| doc.after(node, items))
    }

    pub fn replace_with(&mut self, node: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let args = item_values(&items);
        self.node_op(node, NodeMember::ReplaceWith, args, |doc| {
            doc.replace_with(node, items)
        })
    }

    pub fn append(&mut self, parent: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let args = item_values(&items);
        self.node_op(parent, NodeMember::Append, args, |doc| doc.append(parent, items))
    }

    pub fn prepend(&mut self, parent: NodeId, items: Vec<ChildItem>) -> Result<(), DomError> {
        let args = item_values(&items);
        self.node_op(parent, NodeMember::Prepend, args, |doc| doc.prepend(parent, items))
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_op(
            element,
            NodeMember::SetAttribute,
            vec![name.into(), value.into()],
            |doc| doc.set_attribute(element, name, value),
        )
    }

    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<(), DomError> {
        self.node_op(element, NodeMember::RemoveAttribute, vec![name.into()], |doc| {
            doc.remove_attribute(element, name).map(|_| ())
        })
    }

    pub fn toggle_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        force: Option<bool>,
    ) -> Result<bool, DomError> {
        let mut args = vec![Value::from(name)];
        args.extend(force.map(Value::Bool));
        self.node_op(element, NodeMember::ToggleAttribute, args, |doc| {
            doc.toggle_attribute(element, name, force)
        })
    }

    /// `None` assigns `null`.
    pub fn set_text_content(&mut self, node: NodeId, value: Option<&str>) -> Result<(), DomError> {
        let arg = value.map_or(Value::Null, Value::from);
        self.node_op(node, NodeMember::TextContent, vec![arg], |doc| {
            doc.set_text_content(node, value)
        })
    }

    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) -> Result<(), DomError> {
        self.node_op(node, NodeMember::InnerHtml, vec![markup.into()], |doc| {
            doc.set_inner_html(node, markup)
        })
    }

    pub fn set_id(&mut self, element: NodeId, value: &str) -> Result<(), DomError> {
        self.node_op(element, NodeMember::Id, vec![value.into()], |doc| {
            doc.set_id(element, value)
        })
    }

    pub fn set_class_name(&mut self, element: NodeId, value: &str) -> Result<(), DomError> {
        self.node_op(element, NodeMember::ClassName, vec![value.into()], |doc| {
            doc.set_class_name(element, value)
        })
    }

    pub fn set_node_value(&mut self, node: NodeId, value: Option<&str>) -> Result<(), DomError> {
        let arg = value.map_or(Value::Null, Value::from);
        self.node_op(node, NodeMember::NodeValue, vec![arg], |doc| {
            doc.set_node_value(node, value)
        })
    }

    pub fn style(&mut self, element: NodeId) -> StyleHandle<'_, H> {
        StyleHandle::new(self, element)
    }

    pub fn class_list(&mut self, element: NodeId) -> ClassListHandle<'_, H> {
        ClassListHandle::new(self, element)
    }

    pub fn dataset(&mut self, element: NodeId) -> DatasetHandle<'_, H> {
        DatasetHandle::new(self, element)
    }

    pub fn attributes(&mut self, element: NodeId) -> AttributesHandle<'_, H> {
        AttributesHandle::new(self, element)
    }
}

fn item_values(items: &[ChildItem]) -> Vec<Value> {
    items
        .iter()
        .map(|item| match item {
            ChildItem::Node(id) => Value::Node(*id),
            ChildItem::Text(text) => Value::String(text.clone()),
        })
        .collect()
}

/// Captures a `remove` for every attached node among `record`'s arguments. The
/// target is detached, so running the mutation can only take them out of the live
/// tree. Later paths come first so that applying one removal never shifts the path
/// of the next.
fn capture_departures<H: MutationHook>(
    hook: &mut H,
    doc: &Document,
    record: &MutationRecord,
) -> Vec<(NodeId, H::Report)> {
    let mut attached: Vec<(NodePath, NodeId)> = record
        .args
        .iter()
        .filter_map(|arg| match arg {
            Value::Node(node) if *node != doc.root() => Some(*node),
            _ => None,
        })
        .filter_map(|node| path_of(doc, node, doc.root()).map(|path| (path, node)))
        .collect();
    attached.sort_by(|a, b| b.0.0.cmp(&a.0.0));
    attached.dedup_by_key(|(_, node)| *node);
    if !attached.is_empty() {
        log::trace!(
            target: "mirror.intercept",
            "{} on a detached target takes {} attached node(s)",
            record.operation,
            attached.len()
        );
    }
    attached
        .into_iter()
        .filter_map(|(_, node)| {
            let removal = MutationRecord::new(node, NodeMember::Remove, Vec::new());
            hook.capture(doc, &removal).map(|report| (node, report))
        })
        .collect()
}
