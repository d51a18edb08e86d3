//! Waiter hint table: per-thread slots publishing "I am waiting for lock X,
//! preferably on CPU Y."
//!
//! Slots are indexed `tid mod slots`, so distinct tids can alias one slot.
//! A published slot carries its tid and readers reject mismatches, so
//! aliasing only ever costs a missed hint (never a misattributed one).
//! `active` is the publication field: stored last with Release on publish,
//! stored with Release on clear, loaded first with Acquire on resolve.

use std::sync::atomic::Ordering;

use lockhint_types::{CpuId, LockId, ThreadId};
use tracing::info;

use crate::layout::{
    self, WAITER_ACTIVE, WAITER_INACTIVE, WAITER_SCAN_WINDOW, WAITER_TABLE_SLOTS, WaiterSlot,
};

/// A validated waiter hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterHint {
    /// The awaited lock.
    pub lock_id: LockId,
    /// Preferred CPU; [`CpuId::NONE`] means "resolve via the ownership
    /// table using `lock_id`".
    pub target_cpu: CpuId,
}

/// The waiter hint table.
pub struct WaiterHintTable {
    slots: Box<[WaiterSlot]>,
}

impl WaiterHintTable {
    /// Create a table with every slot inactive.
    #[must_use]
    pub fn new() -> Self {
        let slots: Box<[WaiterSlot]> = (0..WAITER_TABLE_SLOTS).map(|_| WaiterSlot::new()).collect();
        info!(slots = WAITER_TABLE_SLOTS, "waiter hint table created");
        Self { slots }
    }

    /// Publish "`tid` waits for `lock_id`, preferably on `target_cpu`".
    ///
    /// Overwrites whatever the slot held before; the last writer to an
    /// aliased slot wins, which is the intended single-writer-publishes-last
    /// behavior.
    pub fn publish(&self, tid: ThreadId, lock_id: LockId, target_cpu: CpuId) {
        let slot = &self.slots[layout::waiter_slot_index(tid.get())];
        slot.tid.store(tid.get(), Ordering::Relaxed);
        slot.lock_id.store(lock_id.get(), Ordering::Relaxed);
        slot.target_cpu.store(target_cpu.get(), Ordering::Relaxed);
        slot.active.store(WAITER_ACTIVE, Ordering::Release);
    }

    /// Refresh the preferred CPU of an already-published hint (the owner may
    /// have migrated). Plain store; no re-publication.
    pub fn refresh_target_cpu(&self, tid: ThreadId, target_cpu: CpuId) {
        let slot = &self.slots[layout::waiter_slot_index(tid.get())];
        slot.target_cpu.store(target_cpu.get(), Ordering::Relaxed);
    }

    /// Withdraw `tid`'s hint. Idempotent.
    pub fn clear(&self, tid: ThreadId) {
        let slot = &self.slots[layout::waiter_slot_index(tid.get())];
        slot.active.store(WAITER_INACTIVE, Ordering::Release);
    }

    /// The hint published by `tid`, if any.
    ///
    /// Rejects slots whose stored tid does not match (aliasing guard).
    #[must_use]
    pub fn resolve(&self, tid: ThreadId) -> Option<WaiterHint> {
        let slot = &self.slots[layout::waiter_slot_index(tid.get())];
        if slot.active.load(Ordering::Acquire) != WAITER_ACTIVE {
            return None;
        }
        if slot.tid.load(Ordering::Relaxed) != tid.get() {
            return None;
        }
        Some(WaiterHint {
            lock_id: LockId::new(slot.lock_id.load(Ordering::Relaxed)),
            target_cpu: CpuId::new(slot.target_cpu.load(Ordering::Relaxed)),
        })
    }

    /// Best-effort check for any active waiter on `lock_id`.
    ///
    /// Scans a fixed window of [`WAITER_SCAN_WINDOW`] slots starting near a
    /// hash of the lock identity. Waiters publish at their own tid slot, so
    /// this can miss; the release path only uses it to decide whether one
    /// voluntary yield is worth it.
    #[must_use]
    pub fn any_waiter_for(&self, lock_id: LockId) -> bool {
        let start = layout::waiter_scan_origin(lock_id);
        for i in 0..WAITER_SCAN_WINDOW {
            let slot = &self.slots[(start + i) % WAITER_TABLE_SLOTS];
            if slot.active.load(Ordering::Acquire) == WAITER_ACTIVE
                && slot.lock_id.load(Ordering::Relaxed) == lock_id.get()
            {
                return true;
            }
        }
        false
    }

    /// Number of active slots (diagnostic).
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.active.load(Ordering::Relaxed) == WAITER_ACTIVE)
            .count()
    }
}

impl Default for WaiterHintTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WaiterHintTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaiterHintTable")
            .field("slots", &self.slots.len())
            .field("active", &self.active_count())
            .finish()
    }
}
