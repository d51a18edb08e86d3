//! Lock-free shared hint tables.
//!
//! Three fixed-size tables connect the acquisition shim to the scheduling
//! policy: lock ownership (who holds which lock, on which CPU), waiter
//! hints (who waits for which lock, and where it would like to run), and
//! critical-section presence (per-thread nesting depth). All of them are
//! written by application threads and read from a latency-bounded scheduling
//! context, so every operation is wait-free and allocation happens only at
//! construction.
//!
//! The tables are independently — not transactionally — consistent: a reader
//! may observe an ownership insert without the matching presence increment
//! for a short window. Consumers treat everything here as advisory.

pub mod allowed;
pub mod layout;
pub mod ownership;
pub mod presence;
pub mod waiter;

pub use allowed::AllowedSet;
pub use layout::{
    CACHE_LINE_BYTES, CS_TABLE_SLOTS, CsSlot, LOCK_TABLE_BUCKETS, LockBucket, LockEntry,
    MAX_ALLOWED_GROUPS, WAITER_SCAN_WINDOW, WAITER_TABLE_SLOTS, WaiterSlot, bucket_index,
    cs_slot_index, cs_table_bytes, lock_table_bytes, tag_for, waiter_scan_origin,
    waiter_slot_index, waiter_table_bytes,
};
pub use ownership::{LockOwnershipTable, OwnerSnapshot};
pub use presence::CsPresenceTable;
pub use waiter::{WaiterHint, WaiterHintTable};

/// The three hint tables, bundled for sharing between the acquisition shim
/// and the scheduling policy (typically behind an `Arc`).
#[derive(Debug)]
pub struct HintTables {
    /// Lock identity → current holder.
    pub ownership: LockOwnershipTable,
    /// Per-thread waiter hints.
    pub waiters: WaiterHintTable,
    /// Per-thread critical-section depth.
    pub presence: CsPresenceTable,
}

impl HintTables {
    /// Allocate all three tables, hashing with `salt`.
    #[must_use]
    pub fn new(salt: u64) -> Self {
        Self {
            ownership: LockOwnershipTable::new(salt),
            waiters: WaiterHintTable::new(),
            presence: CsPresenceTable::new(),
        }
    }
}
