use core_types::Generation;
use dom::Document;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

pub(crate) struct RootState {
    pub(crate) document: Document,
    pub(crate) generation: Generation,
}

/// Indirection to "the current primary document".
///
/// Harnesses may swap the whole document mid-run; `replace` bumps the generation
/// so the interceptor notices on its next call and re-arms against the new root.
#[derive(Clone)]
pub struct RootHandle {
    inner: Arc<RwLock<RootState>>,
}

impl RootHandle {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RootState {
                document,
                generation: Generation::INITIAL,
            })),
        }
    }

    /// Swaps in a new document and returns the new generation.
    pub fn replace(&self, document: Document) -> Generation {
        let mut state = self.inner.write();
        state.document = document;
        state.generation = state.generation.next();
        log::info!(
            target: "mirror.intercept",
            "primary root replaced (generation {})",
            state.generation.0
        );
        state.generation
    }

    pub fn generation(&self) -> Generation {
        self.inner.read().generation
    }

    pub fn read(&self) -> MappedRwLockReadGuard<'_, Document> {
        RwLockReadGuard::map(self.inner.read(), |state| &state.document)
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, RootState> {
        self.inner.write()
    }
}
