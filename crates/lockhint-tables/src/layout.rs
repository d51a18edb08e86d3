//! Shared table layouts and addressing.
//!
//! This module is pure data: the cache-line-aligned record layouts for the
//! three hint tables, the table sizing constants, and the salted addressing
//! functions. All behavior (insert/publish/resolve) lives in the sibling
//! modules.
//!
//! # Layout contract
//!
//! The record structs are `#[repr(C)]` with explicit padding so their byte
//! layout is stable: an external collaborator that places these tables in a
//! shared mapping can rely on the exact sizes asserted by the tests below.
//!
//! # Publication fields
//!
//! Each record has exactly one designated publication field (`tag`,
//! `active`, `depth`): producers write it last with Release ordering and
//! consumers read it first with Acquire ordering. All other fields are
//! Relaxed and may be observed in a transiently inconsistent state — every
//! consumer tolerates this, because the tables carry hints, not locks.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64};

use lockhint_types::LockId;

/// Cache line size in bytes (x86-64 and AArch64).
pub const CACHE_LINE_BYTES: usize = 64;

/// Number of 2-way buckets in the lock ownership table (power of two).
pub const LOCK_TABLE_BUCKETS: usize = 1024;

/// Number of slots in the waiter hint table.
pub const WAITER_TABLE_SLOTS: usize = 4096;

/// Number of slots in the critical-section presence table.
pub const CS_TABLE_SLOTS: usize = 4096;

/// Capacity of the admission set (controlled process groups per session).
pub const MAX_ALLOWED_GROUPS: usize = 256;

/// Slots inspected by the release-path waiter scan.
pub const WAITER_SCAN_WINDOW: usize = 16;

/// `active` value for a published waiter slot.
pub const WAITER_ACTIVE: u32 = 1;

/// `active` value for an empty / cleared waiter slot.
pub const WAITER_INACTIVE: u32 = 0;

/// Fibonacci hashing multiplier (2^32 / φ), for spreading sequential or
/// pointer-derived keys across power-of-two tables.
const FIBONACCI_MULT: u32 = 2_654_435_769;

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Bucket index for a lock identity in the ownership table.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn bucket_index(lock_id: LockId, salt: u64) -> usize {
    let mixed = (lock_id.get() ^ salt) as u32;
    (mixed.wrapping_mul(FIBONACCI_MULT) as usize) & (LOCK_TABLE_BUCKETS - 1)
}

/// Tag for a lock identity: the salted high 32 bits, forced non-zero.
///
/// Tag 0 is the reserved empty sentinel, so every real tag has its low bit
/// set. Two locks whose salted high bits collide share a tag; the bucket
/// index usually still separates them, and a full collision only costs a
/// misattributed hint.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn tag_for(lock_id: LockId, salt: u64) -> u32 {
    (((lock_id.get() ^ salt) >> 32) as u32) | 1
}

/// Waiter table slot for a thread id. Distinct tids alias; slots carry the
/// publishing tid so consumers can reject aliased reads.
#[inline]
#[must_use]
pub const fn waiter_slot_index(tid: u32) -> usize {
    tid as usize % WAITER_TABLE_SLOTS
}

/// Presence table slot for a thread id.
#[inline]
#[must_use]
pub const fn cs_slot_index(tid: u32) -> usize {
    tid as usize % CS_TABLE_SLOTS
}

/// Start slot for the bounded release-path scan for waiters on `lock_id`.
///
/// This is only a scan origin, not a correctness boundary: waiters publish
/// at `waiter_slot_index(tid)`, so the scan is best-effort by design.
#[inline]
#[must_use]
pub const fn waiter_scan_origin(lock_id: LockId) -> usize {
    (lock_id.get() >> 6) as usize % WAITER_TABLE_SLOTS
}

// ---------------------------------------------------------------------------
// Record layouts
// ---------------------------------------------------------------------------

/// One way of an ownership bucket. Exactly one cache line.
///
/// `tag == 0` means empty. `tag` is the publication field.
#[repr(C, align(64))]
pub struct LockEntry {
    /// Salted tag of the owning lock (0 = empty). Publication field.
    pub tag: AtomicU32,
    /// Thread currently holding the lock.
    pub owner_tid: AtomicU32,
    /// CPU the owner was on at acquisition (-1 if unknown).
    pub owner_cpu: AtomicI32,
    /// Incremented on every insert into this way.
    pub generation: AtomicU32,
    /// Monotonic timestamp of the acquisition, nanoseconds.
    pub acquired_at_ns: AtomicU64,
    _pad: [u8; CACHE_LINE_BYTES - 24],
}

impl LockEntry {
    /// An empty entry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tag: AtomicU32::new(0),
            owner_tid: AtomicU32::new(0),
            owner_cpu: AtomicI32::new(-1),
            generation: AtomicU32::new(0),
            acquired_at_ns: AtomicU64::new(0),
            _pad: [0; CACHE_LINE_BYTES - 24],
        }
    }
}

impl Default for LockEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// A 2-way set-associative ownership bucket, double-cache-line aligned.
#[repr(C, align(128))]
pub struct LockBucket {
    /// The two ways; way 0 is the unconditional eviction victim.
    pub ways: [LockEntry; 2],
}

impl LockBucket {
    /// An empty bucket.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ways: [LockEntry::new(), LockEntry::new()],
        }
    }
}

impl Default for LockBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// One waiter hint slot. Exactly one cache line.
///
/// `active` is the publication field; `tid` disambiguates slot aliasing.
/// `target_cpu == -1` means "unset — resolve through the ownership table".
#[repr(C, align(64))]
pub struct WaiterSlot {
    /// [`WAITER_ACTIVE`] when published. Publication field.
    pub active: AtomicU32,
    /// Publishing thread; readers reject the slot on mismatch.
    pub tid: AtomicU32,
    /// Identity of the awaited lock.
    pub lock_id: AtomicU64,
    /// Preferred CPU (the owner's), or -1.
    pub target_cpu: AtomicI32,
    _pad: [u8; CACHE_LINE_BYTES - 20],
}

impl WaiterSlot {
    /// An inactive slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicU32::new(WAITER_INACTIVE),
            tid: AtomicU32::new(0),
            lock_id: AtomicU64::new(0),
            target_cpu: AtomicI32::new(-1),
            _pad: [0; CACHE_LINE_BYTES - 20],
        }
    }
}

impl Default for WaiterSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// One critical-section presence slot. Exactly one cache line.
#[repr(C, align(64))]
pub struct CsSlot {
    /// Nesting depth of critical sections for threads mapping here.
    /// Publication field (and only field).
    pub depth: AtomicU32,
    _pad: [u8; CACHE_LINE_BYTES - 4],
}

impl CsSlot {
    /// A zero-depth slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            depth: AtomicU32::new(0),
            _pad: [0; CACHE_LINE_BYTES - 4],
        }
    }
}

impl Default for CsSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Region sizing for the external mapping collaborator
// ---------------------------------------------------------------------------

/// Byte size of the lock ownership region.
#[must_use]
pub const fn lock_table_bytes() -> usize {
    std::mem::size_of::<LockBucket>() * LOCK_TABLE_BUCKETS
}

/// Byte size of the waiter hint region.
#[must_use]
pub const fn waiter_table_bytes() -> usize {
    std::mem::size_of::<WaiterSlot>() * WAITER_TABLE_SLOTS
}

/// Byte size of the critical-section presence region.
#[must_use]
pub const fn cs_table_bytes() -> usize {
    std::mem::size_of::<CsSlot>() * CS_TABLE_SLOTS
}
