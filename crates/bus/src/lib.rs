//! Transport between the primary and the replica.
//!
//! Invariants:
//! - One ordered stream per run: patches, checkpoints and resets travel on the
//!   same channel so the replica sees them in the order they were produced.
//! - Sending never blocks the primary. A closed channel is reported to the
//!   sender, which decides whether to log or drop.
use core_types::PatchSeq;
use dom::{Patch, WireNode};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

mod bridge;
mod frame;

pub use bridge::{
    BridgeError, ChannelBridge, DebuggerBridge, EvalRequest, OUTER_HTML_EXPRESSION,
    SERIALIZE_ROOT_EXPRESSION,
};
pub use frame::{FrameError, FrameReader, FrameSink, write_frame};

/// What the primary emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PrimaryEvent {
    Patch { seq: PatchSeq, patch: Patch },
    /// Zero-payload "flush now" signal.
    Checkpoint,
    /// The primary root was swapped; paths from before the swap are meaningless.
    RootReplaced,
}

/// What the replica runtime consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicaCommand {
    Event(PrimaryEvent),
    /// Full resync from a root snapshot.
    Reset(WireNode),
    Shutdown,
}

impl From<PrimaryEvent> for ReplicaCommand {
    fn from(event: PrimaryEvent) -> Self {
        ReplicaCommand::Event(event)
    }
}

/// One flush notification: patches `first..=last` became visible together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flush {
    pub patches: usize,
    pub first: PatchSeq,
    pub last: PatchSeq,
}

/// What the replica runtime reports to observers.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicaEvent {
    Flushed(Flush),
    /// A patch failed against the replica tree and was skipped.
    PatchSkipped { seq: PatchSeq, reason: String },
    /// Primary and replica disagree on the mutation vocabulary.
    ProtocolError { seq: PatchSeq, message: String },
    SequenceGap { expected: PatchSeq, got: PatchSeq },
    /// The replica can no longer follow the stream and needs a full resync.
    ResyncRequired,
    /// A full resync replaced the replica tree.
    Reset,
}

/// Returned by an `EventSink` whose receiving end is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkClosed;

/// Where the primary's events go. Implementations must not block on the receiver.
pub trait EventSink: Send {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed>;
}

impl EventSink for Sender<PrimaryEvent> {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed> {
        Sender::send(self, event).map_err(|_| SinkClosed)
    }
}

impl EventSink for Sender<ReplicaCommand> {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed> {
        Sender::send(self, ReplicaCommand::Event(event)).map_err(|_| SinkClosed)
    }
}

/// An absent sink behaves like a closed one.
impl<S: EventSink> EventSink for Option<S> {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed> {
        self.as_mut().map_or(Err(SinkClosed), |sink| sink.send(event))
    }
}

/// Fans every event out to both sinks; closed only once both are closed.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed> {
        let first = self.0.send(event.clone());
        let second = self.1.send(event);
        first.or(second)
    }
}

pub struct MirrorBus {
    pub cmd_tx: Sender<ReplicaCommand>,
    pub cmd_rx: Receiver<ReplicaCommand>,
    pub evt_tx: Sender<ReplicaEvent>,
    pub evt_rx: Receiver<ReplicaEvent>,
}

impl MirrorBus {
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        Self {
            cmd_tx,
            cmd_rx,
            evt_tx,
            evt_rx,
        }
    }
}

impl Default for MirrorBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{NodeMember, NodePath, PatchArg};
    use serde_json::json;

    #[test]
    fn primary_events_are_tagged_by_type() {
        let event = PrimaryEvent::Patch {
            seq: PatchSeq(3),
            patch: Patch {
                target_path: NodePath(vec![0, 1]),
                prop: NodeMember::TextContent.into(),
                args: vec![PatchArg::String("5".into())],
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "patch",
                "seq": 3,
                "patch": {"targetPath": [0, 1], "prop": "textContent", "args": ["5"]}
            })
        );
        assert_eq!(
            serde_json::to_value(PrimaryEvent::Checkpoint).unwrap(),
            json!({"type": "checkpoint"})
        );
    }

    #[test]
    fn closed_sinks_report_instead_of_blocking() {
        let MirrorBus { mut cmd_tx, cmd_rx, .. } = MirrorBus::new();
        assert!(EventSink::send(&mut cmd_tx, PrimaryEvent::Checkpoint).is_ok());
        assert_eq!(
            cmd_rx.recv().unwrap(),
            ReplicaCommand::Event(PrimaryEvent::Checkpoint)
        );
        drop(cmd_rx);
        assert_eq!(
            EventSink::send(&mut cmd_tx, PrimaryEvent::RootReplaced),
            Err(SinkClosed)
        );
    }

    #[test]
    fn paired_sinks_survive_one_closed_side() {
        let (live_tx, live_rx) = mpsc::channel::<PrimaryEvent>();
        let (dead_tx, dead_rx) = mpsc::channel::<PrimaryEvent>();
        drop(dead_rx);
        let mut pair = (dead_tx, live_tx);
        assert!(pair.send(PrimaryEvent::Checkpoint).is_ok());
        assert_eq!(live_rx.try_recv().unwrap(), PrimaryEvent::Checkpoint);
        drop(live_rx);
        assert_eq!(pair.send(PrimaryEvent::Checkpoint), Err(SinkClosed));
    }
}
