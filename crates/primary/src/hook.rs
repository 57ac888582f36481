use bus::{EventSink, PrimaryEvent};
use core_types::PatchSeq;
use dom::{Document, MutationRecord, Patch, encode};

/// Before/after seam around every intercepted mutation.
///
/// `capture` always sees the tree *before* the mutation runs. `report` runs
/// before or after the mutation depending on the installed `ReportPolicy`.
pub trait MutationHook {
    type Report;

    fn capture(&mut self, doc: &Document, record: &MutationRecord) -> Option<Self::Report>;

    fn report(&mut self, report: Self::Report);

    /// The tracked root was swapped and interception now follows `doc`.
    fn rearmed(&mut self, _doc: &Document) {}

    /// The primary reached a step boundary.
    fn checkpoint(&mut self) {}
}

/// Encodes mutations into patches and pushes them to a sink without ever
/// blocking or failing the primary.
pub struct PatchRecorder<S> {
    sink: S,
    next_seq: PatchSeq,
    sent: u64,
    dropped: u64,
    encode_failures: u64,
    closed_logged: bool,
}

impl<S: EventSink> PatchRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            next_seq: PatchSeq::FIRST,
            sent: 0,
            dropped: 0,
            encode_failures: 0,
            closed_logged: false,
        }
    }

    /// Sequence number of the most recently numbered patch.
    pub fn last_seq(&self) -> PatchSeq {
        PatchSeq(self.next_seq.0 - 1)
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Events lost because the transport was closed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn encode_failures(&self) -> u64 {
        self.encode_failures
    }

    fn send(&mut self, event: PrimaryEvent) {
        match self.sink.send(event) {
            Ok(()) => self.sent += 1,
            Err(_) => {
                self.dropped += 1;
                if !self.closed_logged {
                    self.closed_logged = true;
                    log::warn!(
                        target: "mirror.bus",
                        "transport closed; dropping events until a full resync"
                    );
                }
            }
        }
    }
}

impl<S: EventSink> MutationHook for PatchRecorder<S> {
    type Report = Patch;

    fn capture(&mut self, doc: &Document, record: &MutationRecord) -> Option<Patch> {
        match encode(doc, record) {
            Ok(patch) => patch,
            Err(err) => {
                self.encode_failures += 1;
                log::warn!(
                    target: "mirror.encode",
                    "not reporting {} on {:?}: {err}",
                    record.operation,
                    record.target
                );
                None
            }
        }
    }

    fn report(&mut self, patch: Patch) {
        let seq = self.next_seq;
        self.next_seq = seq.next();
        log::trace!(target: "mirror.intercept", "patch {seq} {} at {}", patch.prop, patch.target_path);
        self.send(PrimaryEvent::Patch { seq, patch });
    }

    fn rearmed(&mut self, _doc: &Document) {
        self.send(PrimaryEvent::RootReplaced);
    }

    fn checkpoint(&mut self) {
        self.send(PrimaryEvent::Checkpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::NodeMember;
    use std::sync::mpsc;

    #[test]
    fn patches_are_numbered_from_first() {
        let (tx, rx) = mpsc::channel::<PrimaryEvent>();
        let mut recorder = PatchRecorder::new(tx);
        let doc = Document::parse("<html><body></body></html>");
        let body = doc.body().unwrap();
        for _ in 0..2 {
            let record = MutationRecord::new(body, NodeMember::TextContent, vec!["x".into()]);
            let patch = recorder.capture(&doc, &record).unwrap();
            recorder.report(patch);
        }
        let seqs: Vec<_> = rx
            .try_iter()
            .map(|event| match event {
                PrimaryEvent::Patch { seq, .. } => seq,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(seqs, vec![PatchSeq(1), PatchSeq(2)]);
        assert_eq!(recorder.last_seq(), PatchSeq(2));
    }

    #[test]
    fn closed_transport_counts_drops() {
        let (tx, rx) = mpsc::channel::<PrimaryEvent>();
        drop(rx);
        let mut recorder = PatchRecorder::new(tx);
        recorder.checkpoint();
        recorder.checkpoint();
        assert_eq!(recorder.dropped(), 2);
        assert_eq!(recorder.sent(), 0);
    }
}
