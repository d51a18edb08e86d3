//! Critical-section presence table: per-thread nesting depth counters.
//!
//! `depth` is both payload and publication field. `leave` on a zero depth
//! applies the decrement first and then re-stores 0, so a concurrent reader
//! can briefly observe a wrapped value before the clamp lands; the worst
//! consequence is one oversized slice grant, and the window is a handful of
//! instructions. Kept as-is rather than papered over with CAS.

use std::sync::atomic::Ordering;

use lockhint_types::ThreadId;
use tracing::info;

use crate::layout::{self, CS_TABLE_SLOTS, CsSlot};

/// The critical-section presence table.
pub struct CsPresenceTable {
    slots: Box<[CsSlot]>,
}

impl CsPresenceTable {
    /// Create a table with every depth at zero.
    #[must_use]
    pub fn new() -> Self {
        let slots: Box<[CsSlot]> = (0..CS_TABLE_SLOTS).map(|_| CsSlot::new()).collect();
        info!(slots = CS_TABLE_SLOTS, "critical-section presence table created");
        Self { slots }
    }

    /// Record that `tid` entered a critical section.
    pub fn enter(&self, tid: ThreadId) {
        let slot = &self.slots[layout::cs_slot_index(tid.get())];
        slot.depth.fetch_add(1, Ordering::Release);
    }

    /// Record that `tid` left a critical section.
    ///
    /// Underflow (leave without a matching enter, e.g. after slot aliasing
    /// or an abnormal termination left the counter stale) is clamped back to
    /// zero.
    pub fn leave(&self, tid: ThreadId) {
        let slot = &self.slots[layout::cs_slot_index(tid.get())];
        let pre = slot.depth.fetch_sub(1, Ordering::Release);
        if pre == 0 {
            slot.depth.store(0, Ordering::Release);
        }
    }

    /// Whether `tid` is (apparently) inside a critical section.
    #[inline]
    #[must_use]
    pub fn is_in_cs(&self, tid: ThreadId) -> bool {
        self.depth(tid) != 0
    }

    /// Current nesting depth for `tid`'s slot.
    #[inline]
    #[must_use]
    pub fn depth(&self, tid: ThreadId) -> u32 {
        let slot = &self.slots[layout::cs_slot_index(tid.get())];
        slot.depth.load(Ordering::Acquire)
    }
}

impl Default for CsPresenceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CsPresenceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsPresenceTable")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_leave_balanced() {
        let table = CsPresenceTable::new();
        let tid = ThreadId::new(11);

        assert!(!table.is_in_cs(tid));
        table.enter(tid);
        assert!(table.is_in_cs(tid));
        assert_eq!(table.depth(tid), 1);
        table.leave(tid);
        assert!(!table.is_in_cs(tid));
    }

    #[test]
    fn test_nesting() {
        let table = CsPresenceTable::new();
        let tid = ThreadId::new(2);

        table.enter(tid);
        table.enter(tid);
        table.enter(tid);
        assert_eq!(table.depth(tid), 3);
        table.leave(tid);
        assert_eq!(table.depth(tid), 2);
        table.leave(tid);
        table.leave(tid);
        assert_eq!(table.depth(tid), 0);
    }

    #[test]
    fn test_leave_without_enter_clamps_to_zero() {
        let table = CsPresenceTable::new();
        let tid = ThreadId::new(42);

        table.leave(tid);
        assert_eq!(table.depth(tid), 0, "underflow must not persist");
        assert!(!table.is_in_cs(tid));

        // Still usable afterwards.
        table.enter(tid);
        assert_eq!(table.depth(tid), 1);
    }

    #[test]
    fn test_aliased_tids_share_a_slot() {
        let table = CsPresenceTable::new();
        let t1 = ThreadId::new(9);
        let t2 = ThreadId::new(9 + u32::try_from(CS_TABLE_SLOTS).unwrap());

        table.enter(t1);
        // Aliasing is expected: the table answers per-slot, and consumers
        // treat the answer as advisory.
        assert!(table.is_in_cs(t2));
        table.leave(t2);
        assert!(!table.is_in_cs(t1));
    }
}
