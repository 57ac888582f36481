use std::sync::Arc;

use bus::{PrimaryEvent, ReplicaEvent};
use core_types::PatchSeq;
use dom::{Document, Patch, WireError, WireNode, document_from_snapshot};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::apply::{ApplyError, apply};
use crate::flush::FlushCoordinator;

struct Published {
    document: Document,
    flushes: u64,
}

/// The visible replica tree. Cheap to clone; readers on other threads only ever
/// see states published by a checkpoint or a reset.
#[derive(Clone)]
pub struct ReplicaView {
    published: Arc<RwLock<Published>>,
}

impl ReplicaView {
    fn new(document: Document) -> Self {
        Self {
            published: Arc::new(RwLock::new(Published {
                document,
                flushes: 0,
            })),
        }
    }

    pub fn read(&self) -> MappedRwLockReadGuard<'_, Document> {
        RwLockReadGuard::map(self.published.read(), |p| &p.document)
    }

    /// Markup of the visible document element, empty when there is none.
    pub fn outer_html(&self) -> String {
        let doc = self.read();
        doc.document_element()
            .map(|element| doc.outer_html(element))
            .unwrap_or_default()
    }

    /// Number of publications so far (checkpoint flushes and resets).
    pub fn flush_count(&self) -> u64 {
        self.published.read().flushes
    }

    fn publish(&self, document: Document) {
        let mut published = self.published.write();
        published.document = document;
        published.flushes += 1;
    }
}

/// Detached nodes tolerated between checkpoints before the working tree is
/// compacted early.
const COMPACT_SLACK: usize = 4096;

/// Working tree plus published view, driven by the primary's event stream.
///
/// The replica holds no `NodeId`s across patches, so nodes a patch leaves detached
/// are garbage and the working tree is compacted at every checkpoint.
pub struct Replica {
    working: Document,
    view: ReplicaView,
    flush: FlushCoordinator,
    expected: Option<PatchSeq>,
    awaiting_resync: bool,
    compact_at: usize,
}

impl Replica {
    pub fn new(mut document: Document) -> Self {
        document.compact();
        let view = ReplicaView::new(document.clone());
        Self {
            compact_at: compact_threshold(&document),
            working: document,
            view,
            flush: FlushCoordinator::new(),
            expected: None,
            awaiting_resync: false,
        }
    }

    pub fn from_snapshot(root: &WireNode) -> Result<Self, WireError> {
        Ok(Self::new(document_from_snapshot(root)?))
    }

    pub fn working(&self) -> &Document {
        &self.working
    }

    pub fn view(&self) -> ReplicaView {
        self.view.clone()
    }

    pub fn flush_coordinator(&self) -> FlushCoordinator {
        self.flush.clone()
    }

    pub fn is_awaiting_resync(&self) -> bool {
        self.awaiting_resync
    }

    /// Handles one event from the primary and returns what observers should hear.
    pub fn handle_event(&mut self, event: PrimaryEvent) -> Vec<ReplicaEvent> {
        match event {
            PrimaryEvent::Patch { seq, patch } => self.apply_patch(seq, &patch),
            PrimaryEvent::Checkpoint => self
                .checkpoint()
                .map(ReplicaEvent::Flushed)
                .into_iter()
                .collect(),
            PrimaryEvent::RootReplaced => {
                if self.awaiting_resync {
                    return Vec::new();
                }
                log::warn!(
                    target: "mirror.resync",
                    "primary root replaced; ignoring patches until a full resync"
                );
                self.awaiting_resync = true;
                vec![ReplicaEvent::ResyncRequired]
            }
        }
    }

    pub fn apply_patch(&mut self, seq: PatchSeq, patch: &Patch) -> Vec<ReplicaEvent> {
        if self.awaiting_resync {
            log::debug!(target: "mirror.apply", "patch {seq} dropped while awaiting resync");
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(expected) = self.expected
            && expected != seq
        {
            log::warn!(
                target: "mirror.apply",
                "sequence gap: expected {expected}, got {seq}; continuing"
            );
            events.push(ReplicaEvent::SequenceGap { expected, got: seq });
        }
        self.expected = Some(seq.next());

        match apply(&mut self.working, patch) {
            Ok(_) => {
                self.flush.record_applied(seq);
                if self.working.node_count() > self.compact_at {
                    self.reclaim();
                }
            }
            Err(ApplyError::UnknownOperation(name)) => {
                log::error!(
                    target: "mirror.apply",
                    "patch {seq}: operation {name:?} is not in the replica vocabulary"
                );
                events.push(ReplicaEvent::ProtocolError {
                    seq,
                    message: format!("unknown operation {name:?}"),
                });
            }
            Err(err) => {
                log::warn!(target: "mirror.apply", "patch {seq} skipped: {err}");
                events.push(ReplicaEvent::PatchSkipped {
                    seq,
                    reason: err.to_string(),
                });
            }
        }
        events
    }

    /// Publishes the working tree if anything was applied since the last checkpoint.
    pub fn checkpoint(&mut self) -> Option<crate::Flush> {
        let flush = self.flush.checkpoint()?;
        self.reclaim();
        self.view.publish(self.working.clone());
        Some(flush)
    }

    fn reclaim(&mut self) {
        let reclaimed = self.working.compact();
        self.compact_at = compact_threshold(&self.working);
        if reclaimed > 0 {
            log::trace!(target: "mirror.apply", "reclaimed {reclaimed} detached node(s)");
        }
    }

    /// Full resync: rebuilds the working tree from `root` and publishes it at once.
    pub fn reset(&mut self, root: &WireNode) -> Result<(), WireError> {
        let document = document_from_snapshot(root)?;
        let dropped = self.flush.discard();
        log::info!(
            target: "mirror.resync",
            "replica reset from snapshot ({dropped} buffered patch(es) discarded)"
        );
        self.working = document;
        self.compact_at = compact_threshold(&self.working);
        self.view.publish(self.working.clone());
        self.expected = None;
        self.awaiting_resync = false;
        Ok(())
    }
}

fn compact_threshold(document: &Document) -> usize {
    2 * document.node_count() + COMPACT_SLACK
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{NodeMember, NodePath, PatchArg};

    fn text_patch(path: &[u32], text: &str) -> Patch {
        Patch {
            target_path: NodePath(path.to_vec()),
            prop: NodeMember::TextContent.into(),
            args: vec![PatchArg::String(text.into())],
        }
    }

    fn replica() -> Replica {
        Replica::new(Document::parse("<html><body><p>0</p></body></html>"))
    }

    #[test]
    fn nothing_is_visible_before_the_checkpoint() {
        let mut replica = replica();
        let view = replica.view();
        assert!(replica.apply_patch(PatchSeq(1), &text_patch(&[0, 1, 0], "1")).is_empty());
        assert_eq!(view.outer_html(), "<html><body><p>0</p></body></html>");
        let events = replica.handle_event(PrimaryEvent::Checkpoint);
        assert_eq!(events.len(), 1);
        assert_eq!(view.outer_html(), "<html><body><p>1</p></body></html>");
        assert_eq!(view.flush_count(), 1);
    }

    #[test]
    fn empty_checkpoint_does_not_publish() {
        let mut replica = replica();
        assert!(replica.handle_event(PrimaryEvent::Checkpoint).is_empty());
        assert_eq!(replica.view().flush_count(), 0);
    }

    #[test]
    fn gaps_are_reported_and_application_continues() {
        let mut replica = replica();
        replica.apply_patch(PatchSeq(1), &text_patch(&[0, 1, 0], "1"));
        let events = replica.apply_patch(PatchSeq(3), &text_patch(&[0, 1, 0], "3"));
        assert_eq!(
            events,
            vec![ReplicaEvent::SequenceGap {
                expected: PatchSeq(2),
                got: PatchSeq(3),
            }]
        );
        replica.checkpoint();
        assert_eq!(replica.view().outer_html(), "<html><body><p>3</p></body></html>");
    }

    #[test]
    fn root_replacement_waits_for_reset() {
        let mut replica = replica();
        assert_eq!(
            replica.handle_event(PrimaryEvent::RootReplaced),
            vec![ReplicaEvent::ResyncRequired]
        );
        assert!(replica.apply_patch(PatchSeq(1), &text_patch(&[0, 1, 0], "x")).is_empty());
        assert_eq!(replica.flush_coordinator().pending(), 0);

        let root = WireNode::parse(r#"["html",{},[["body",{},[["Text","fresh"]]]]]"#).unwrap();
        replica.reset(&root).unwrap();
        assert!(!replica.is_awaiting_resync());
        assert_eq!(replica.view().outer_html(), "<html><body>fresh</body></html>");
    }

    #[test]
    fn failing_patches_are_skipped() {
        let mut replica = replica();
        let events = replica.apply_patch(PatchSeq(1), &text_patch(&[0, 5], "x"));
        assert!(matches!(events.as_slice(), [ReplicaEvent::PatchSkipped { .. }]));
        assert!(replica.checkpoint().is_none());
    }

    #[test]
    fn repeated_text_writes_do_not_grow_the_tree() {
        let mut replica = replica();
        let settled = replica.working().node_count();
        for n in 1..=10_000u64 {
            replica.apply_patch(PatchSeq(n), &text_patch(&[0, 1, 0], &n.to_string()));
            assert!(replica.working().node_count() <= compact_threshold_for(settled));
            if n % 1_000 == 0 {
                replica.checkpoint();
                assert_eq!(replica.working().node_count(), settled);
                assert_eq!(replica.view().read().node_count(), settled);
            }
        }
        assert_eq!(replica.view().outer_html(), "<html><body><p>10000</p></body></html>");
    }

    fn compact_threshold_for(nodes: usize) -> usize {
        2 * nodes + COMPACT_SLACK + 1
    }
}
