use serde::{Deserialize, Serialize};

/// Position of a patch in the primary's outgoing stream.
///
/// Sequence numbers start at 1 for every run; 0 is reserved so an
/// uninitialised counter can never be mistaken for the first patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSeq(pub u64);

impl PatchSeq {
    pub const NONE: PatchSeq = PatchSeq(0);
    pub const FIRST: PatchSeq = PatchSeq(1);

    pub fn next(self) -> Self {
        PatchSeq(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for PatchSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counts how many times the primary root has been swapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    pub const INITIAL: Generation = Generation(0);

    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// When an intercepted mutation is handed to the transport relative to the
/// original operation running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportPolicy {
    /// Report first, then mutate. Lower latency; observers reading the
    /// primary during the callback still see the pre-mutation tree.
    ReportBefore,
    /// Mutate first, then report. Failed operations are never reported.
    #[default]
    ReportAfter,
}
