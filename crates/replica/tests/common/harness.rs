#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, Sender};

use bus::{EventSink, FrameReader, FrameSink, PrimaryEvent, ReplicaEvent};
use core_types::ReportPolicy;
use dom::Document;
use primary::{InterceptConfig, PatchRecorder, Primary, RootHandle};
use replica::Replica;

pub type RecordingPrimary = Primary<PatchRecorder<Sender<PrimaryEvent>>>;

/// A primary and a replica wired together through an inspectable channel.
pub struct Harness {
    pub primary: RecordingPrimary,
    pub replica: Replica,
    pub events: Receiver<PrimaryEvent>,
}

impl Harness {
    pub fn new(markup: &str, policy: ReportPolicy) -> Self {
        let (tx, events) = mpsc::channel();
        let mut primary = Primary::new(RootHandle::new(Document::parse(markup)));
        primary.install(InterceptConfig::with_policy(policy), PatchRecorder::new(tx));
        Self {
            primary,
            replica: Replica::new(Document::parse(markup)),
            events,
        }
    }

    /// Everything the primary emitted since the last drain.
    pub fn drain(&self) -> Vec<PrimaryEvent> {
        self.events.try_iter().collect()
    }

    /// Delivers everything pending to the replica in order.
    pub fn pump(&mut self) -> Vec<ReplicaEvent> {
        let pending = self.drain();
        self.deliver(pending)
    }

    /// Like `pump`, but every event crosses a JSON-lines frame on the way.
    pub fn pump_framed(&mut self) -> Vec<ReplicaEvent> {
        let mut sink = FrameSink::new(Vec::new());
        for event in self.drain() {
            sink.send(event).expect("in-memory frames never close");
        }
        let bytes = sink.into_inner().unwrap_or_default();
        let mut reader = FrameReader::new(bytes.as_slice());
        let mut events = Vec::new();
        while let Some(event) = reader.next_frame::<PrimaryEvent>().expect("frames decode") {
            events.push(event);
        }
        self.deliver(events)
    }

    pub fn deliver(&mut self, events: Vec<PrimaryEvent>) -> Vec<ReplicaEvent> {
        events
            .into_iter()
            .flat_map(|event| self.replica.handle_event(event))
            .collect()
    }

    pub fn primary_html(&self) -> String {
        self.primary.read(|doc| {
            doc.document_element()
                .map(|element| doc.outer_html(element))
                .unwrap_or_default()
        })
    }

    pub fn assert_mirrored(&self) {
        let view = self.replica.view();
        self.primary
            .read(|doc| dom_test_support::assert_mirrored(doc, &view.read()));
    }
}
