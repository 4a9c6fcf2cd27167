//! Gap detection over the retiring half of the receive window
//!
//! Each adjacent slot pair `(i, i + 1)` in the retiring half is classified
//! once. Only an empty first slot counts as a loss; a present packet whose
//! successor is missing contributes no jitter sample and no extra loss, since
//! the successor's own slot is classified when it becomes the first of a pair.

use crate::packet::PacketRecord;

/// Classification of one adjacent slot pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict<'a> {
    /// The first slot is empty: the packet was lost or arrived too late
    Lost,
    /// The first slot is present but its successor is not; sample skipped
    MissingSuccessor(&'a PacketRecord),
    /// Both slots are present and feed the jitter estimator
    Pair(&'a PacketRecord, &'a PacketRecord),
}

impl PairVerdict<'_> {
    /// Whether this verdict counts as a lost packet
    #[inline]
    pub fn is_lost(&self) -> bool {
        matches!(self, PairVerdict::Lost)
    }
}

/// Classify an adjacent slot pair
pub fn evaluate<'a>(
    slot_a: Option<&'a PacketRecord>,
    slot_b: Option<&'a PacketRecord>,
) -> PairVerdict<'a> {
    match (slot_a, slot_b) {
        (None, _) => PairVerdict::Lost,
        (Some(prev), None) => PairVerdict::MissingSuccessor(prev),
        (Some(prev), Some(curr)) => PairVerdict::Pair(prev, curr),
    }
}
