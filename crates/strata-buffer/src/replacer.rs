//! Replacement policy for choosing which unpinned buffer to reuse.

use strata_wal::Lsn;

use crate::pool::SlotId;

/// An unpinned pool slot as seen by the replacement policy.
///
/// The pool never offers a pinned slot as a candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The slot being offered for reuse.
    pub slot: SlotId,
    /// Slot is still bound to its placeholder identity and has never
    /// held a real block.
    pub never_assigned: bool,
    /// Slot holds a modification that has not been written back.
    pub modified: bool,
    /// LSN of the outstanding modification, if it was logged.
    pub lsn: Option<Lsn>,
}

/// Trait for buffer replacement algorithms.
pub trait ReplacementPolicy: Send + Sync {
    /// Selects the slot to reuse.
    ///
    /// Returns None when no candidate is acceptable (in particular when
    /// `candidates` is empty, i.e. every slot is pinned).
    fn choose(&self, candidates: &[Candidate]) -> Option<SlotId>;
}

/// Default replacement policy.
///
/// Selection order:
/// 1. A slot that has never held a real block, so the pool fills all
///    empty capacity before evicting any cached block.
/// 2. The modified slot whose outstanding write is oldest, i.e. the one
///    with the minimum LSN. An unlogged modification counts as oldest.
/// 3. Otherwise, any unmodified slot.
///
/// Step 2 deliberately reuses modified slots ahead of unmodified ones;
/// a dedicated test pins down that ordering so any future change to it
/// is a conscious one.
pub struct OldestWriteFirst;

impl ReplacementPolicy for OldestWriteFirst {
    fn choose(&self, candidates: &[Candidate]) -> Option<SlotId> {
        if let Some(c) = candidates.iter().find(|c| c.never_assigned) {
            return Some(c.slot);
        }
        candidates
            .iter()
            .filter(|c| c.modified)
            .min_by_key(|c| c.lsn)
            .or_else(|| candidates.iter().find(|c| !c.modified))
            .map(|c| c.slot)
    }
}
