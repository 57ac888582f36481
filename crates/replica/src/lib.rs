//! The replica side: applies the primary's patches in order to a working tree and
//! publishes it to readers only at checkpoints.
//!
//! Invariants:
//! - Patches are applied one at a time in arrival order against the working tree.
//! - Readers of `ReplicaView` never observe a partially applied checkpoint batch.
//! - A failed patch is skipped and reported; it never stops the stream.
mod apply;
mod config;
mod flush;
mod replica;
mod resync;

pub use apply::{ApplyError, apply};
pub use bus::Flush;
pub use config::{RESYNC_TIMEOUT_ENV, ReplicaConfig};
pub use flush::FlushCoordinator;
pub use replica::{Replica, ReplicaView};
pub use resync::{ResyncClient, ResyncError};
