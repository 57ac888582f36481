//! Checkpoint/flush coordination.
//!
//! States: `Idle` (nothing pending) and `Buffering` (patches applied to the working
//! tree but not yet visible). Applying a patch moves `Idle -> Buffering`; a
//! checkpoint drains the whole buffer in one step and returns to `Idle`. A
//! checkpoint with nothing buffered produces no flush.
use std::sync::Arc;

use bus::Flush;
use core_types::PatchSeq;
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FlushState {
    #[default]
    Idle,
    Buffering {
        first: PatchSeq,
        last: PatchSeq,
        count: usize,
    },
}

/// Shared between whoever applies patches and whoever signals checkpoints.
#[derive(Clone, Default)]
pub struct FlushCoordinator {
    state: Arc<Mutex<FlushState>>,
}

impl FlushCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self, seq: PatchSeq) {
        let mut state = self.state.lock();
        *state = match *state {
            FlushState::Idle => FlushState::Buffering {
                first: seq,
                last: seq,
                count: 1,
            },
            FlushState::Buffering { first, count, .. } => FlushState::Buffering {
                first,
                last: seq,
                count: count + 1,
            },
        };
    }

    /// Drains everything buffered since the previous checkpoint.
    pub fn checkpoint(&self) -> Option<Flush> {
        let drained = std::mem::take(&mut *self.state.lock());
        match drained {
            FlushState::Idle => None,
            FlushState::Buffering { first, last, count } => {
                log::debug!(target: "mirror.flush", "flushing {count} patch(es) {first}..={last}");
                Some(Flush {
                    patches: count,
                    first,
                    last,
                })
            }
        }
    }

    /// Drops the buffer without a flush (used by full resync). Returns how many
    /// patches were dropped.
    pub fn discard(&self) -> usize {
        match std::mem::take(&mut *self.state.lock()) {
            FlushState::Idle => 0,
            FlushState::Buffering { count, .. } => count,
        }
    }

    pub fn pending(&self) -> usize {
        match *self.state.lock() {
            FlushState::Idle => 0,
            FlushState::Buffering { count, .. } => count,
        }
    }

    pub fn is_buffering(&self) -> bool {
        self.pending() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn one_flush_per_checkpoint_covering_all_patches() {
        let flush = FlushCoordinator::new();
        assert_eq!(flush.checkpoint(), None);
        for seq in 1..=4 {
            flush.record_applied(PatchSeq(seq));
        }
        assert!(flush.is_buffering());
        assert_eq!(
            flush.checkpoint(),
            Some(Flush {
                patches: 4,
                first: PatchSeq(1),
                last: PatchSeq(4),
            })
        );
        assert_eq!(flush.checkpoint(), None);
    }

    #[test]
    fn drains_are_atomic_across_threads() {
        let flush = FlushCoordinator::new();
        let writer = {
            let flush = flush.clone();
            thread::spawn(move || {
                for seq in 1..=1000 {
                    flush.record_applied(PatchSeq(seq));
                }
            })
        };
        let mut total = 0;
        while !writer.is_finished() {
            total += flush.checkpoint().map_or(0, |f| f.patches);
        }
        writer.join().unwrap();
        total += flush.checkpoint().map_or(0, |f| f.patches);
        assert_eq!(total, 1000);
    }

    #[test]
    fn discard_empties_without_flush() {
        let flush = FlushCoordinator::new();
        flush.record_applied(PatchSeq(7));
        assert_eq!(flush.discard(), 1);
        assert_eq!(flush.checkpoint(), None);
    }
}
