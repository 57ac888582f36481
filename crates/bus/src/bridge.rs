//! The out-of-band request/response channel used for full resync.
//!
//! The core only ever asks the host to evaluate an expression in the paused
//! primary and hand back the stringified result. Attaching to the primary and
//! managing the debug session belong to the host.
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use thiserror::Error;

/// Evaluates to the JSON `WireNode` of the primary's document element.
pub const SERIALIZE_ROOT_EXPRESSION: &str = "__domMirror.serializeRoot()";
/// Evaluates to the primary's document element markup as a JSON string.
pub const OUTER_HTML_EXPRESSION: &str = "__domMirror.outerHTML()";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),
    #[error("debugger bridge disconnected")]
    Disconnected,
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

pub trait DebuggerBridge {
    /// Blocks for at most `timeout`.
    fn evaluate(&self, expression: &str, timeout: Duration) -> Result<String, BridgeError>;
}

/// One evaluation request as seen by the primary side.
#[derive(Debug)]
pub struct EvalRequest {
    pub expression: String,
    pub reply: Sender<Result<String, String>>,
}

impl EvalRequest {
    /// Sends the answer; a requester that already gave up is ignored.
    pub fn respond(self, result: Result<String, String>) {
        if self.reply.send(result).is_err() {
            log::debug!(
                target: "mirror.resync",
                "requester for {:?} is gone (timed out?)",
                self.expression
            );
        }
    }
}

/// In-process bridge: requests go over a channel to whoever serves the primary.
#[derive(Clone)]
pub struct ChannelBridge {
    requests: Sender<EvalRequest>,
}

impl ChannelBridge {
    pub fn new() -> (Self, Receiver<EvalRequest>) {
        let (requests, rx) = mpsc::channel();
        (Self { requests }, rx)
    }
}

impl DebuggerBridge for ChannelBridge {
    fn evaluate(&self, expression: &str, timeout: Duration) -> Result<String, BridgeError> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(EvalRequest {
                expression: expression.to_string(),
                reply,
            })
            .map_err(|_| BridgeError::Disconnected)?;
        match response.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(BridgeError::Evaluation(message)),
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Disconnected),
        }
    }
}
