use dom::{
    Document, InvokeError, NodePath, Patch, PatchArg, Value, WireError, invoke, materialize,
    resolve,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("target path {0} does not resolve")]
    StaleTarget(NodePath),
    #[error("argument {index}: path {path} does not resolve")]
    StaleArgument { index: usize, path: NodePath },
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("argument {index}: {source}")]
    Snapshot {
        index: usize,
        #[source]
        source: WireError,
    },
    #[error(transparent)]
    Invoke(InvokeError),
}

impl ApplyError {
    /// Everything except a vocabulary mismatch only affects the one patch.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ApplyError::UnknownOperation(_))
    }
}

impl From<InvokeError> for ApplyError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::UnknownOperation(name) => ApplyError::UnknownOperation(name),
            other => ApplyError::Invoke(other),
        }
    }
}

/// Applies one patch against the current state of `doc`.
///
/// There is no rollback: a patch that fails halfway may leave partial effects.
pub fn apply(doc: &mut Document, patch: &Patch) -> Result<Value, ApplyError> {
    let root = doc.root();
    let target = resolve(doc, root, &patch.target_path)
        .ok_or_else(|| ApplyError::StaleTarget(patch.target_path.clone()))?;
    patch.prop.resolve()?;
    let mut args = Vec::with_capacity(patch.args.len());
    for (index, arg) in patch.args.iter().enumerate() {
        args.push(decode_arg(doc, index, arg)?);
    }
    log::trace!(target: "mirror.apply", "{} at {}", patch.prop, patch.target_path);
    Ok(invoke(doc, target, &patch.prop, args)?)
}

fn decode_arg(doc: &mut Document, index: usize, arg: &PatchArg) -> Result<Value, ApplyError> {
    Ok(match arg {
        PatchArg::Null => Value::Null,
        PatchArg::Bool(b) => Value::Bool(*b),
        PatchArg::Number(n) => Value::Number(*n),
        PatchArg::String(s) => Value::String(s.clone()),
        PatchArg::Path(path) => {
            let root = doc.root();
            let node = resolve(doc, root, path).ok_or_else(|| ApplyError::StaleArgument {
                index,
                path: path.clone(),
            })?;
            Value::Node(node)
        }
        PatchArg::Node(wire) => Value::Node(
            materialize(doc, wire).map_err(|source| ApplyError::Snapshot { index, source })?,
        ),
    })
}
