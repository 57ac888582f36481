//! Full resync: fetch the primary's root snapshot over the debugger bridge and
//! rebuild the replica from it.
use std::sync::mpsc::Sender;
use std::time::Duration;

use bus::{BridgeError, DebuggerBridge, ReplicaCommand, SERIALIZE_ROOT_EXPRESSION};
use dom::{WireError, WireNode};
use thiserror::Error;

use crate::{Replica, ReplicaConfig};

#[derive(Debug, Error)]
pub enum ResyncError {
    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),
    #[error("root snapshot: {0}")]
    Decode(#[from] WireError),
    #[error("replica runtime is gone")]
    Closed,
}

pub struct ResyncClient<B: DebuggerBridge> {
    bridge: B,
    timeout: Duration,
}

impl<B: DebuggerBridge> ResyncClient<B> {
    pub fn new(bridge: B, config: &ReplicaConfig) -> Self {
        Self {
            bridge,
            timeout: config.resync_timeout,
        }
    }

    pub fn fetch_root(&self) -> Result<WireNode, ResyncError> {
        log::debug!(target: "mirror.resync", "requesting root snapshot");
        let json = self.bridge.evaluate(SERIALIZE_ROOT_EXPRESSION, self.timeout)?;
        Ok(WireNode::parse(&json)?)
    }

    /// Resyncs a replica owned by the caller.
    pub fn resync(&self, replica: &mut Replica) -> Result<(), ResyncError> {
        let root = self.fetch_root()?;
        replica.reset(&root)?;
        Ok(())
    }

    /// Resyncs a replica owned by a runtime thread.
    pub fn request_reset(&self, commands: &Sender<ReplicaCommand>) -> Result<(), ResyncError> {
        let root = self.fetch_root()?;
        commands
            .send(ReplicaCommand::Reset(root))
            .map_err(|_| ResyncError::Closed)
    }
}
