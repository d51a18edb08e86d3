//! Lock ownership table: 2-way set-associative map from lock identity to
//! the current holder.
//!
//! Writers are the acquiring/releasing threads themselves; readers are the
//! scheduling policy and contended waiters resolving a target CPU. The
//! publication protocol is tag-last: non-tag fields are stored Relaxed, then
//! `tag` is stored with Release. Readers load `tag` with Acquire and, on a
//! match, read the payload Relaxed — a reader racing an insert may observe a
//! torn owner, which is acceptable because the entry is a hint, never relied
//! upon for exclusion.

use std::sync::atomic::Ordering;

use lockhint_types::{CpuId, LockId, ThreadId};
use tracing::{debug, info};

use crate::layout::{self, LOCK_TABLE_BUCKETS, LockBucket};

/// Best-effort snapshot of an ownership entry.
///
/// Fields other than the tag are not synchronized with each other; a
/// snapshot taken concurrently with an insert may mix old and new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerSnapshot {
    /// Holder thread id.
    pub tid: ThreadId,
    /// CPU the holder published at acquisition.
    pub cpu: CpuId,
    /// Insert generation of the entry's way.
    pub generation: u32,
    /// Monotonic acquisition timestamp, nanoseconds.
    pub acquired_at_ns: u64,
}

/// The lock ownership table.
pub struct LockOwnershipTable {
    buckets: Box<[LockBucket]>,
    salt: u64,
}

impl LockOwnershipTable {
    /// Create an empty table with the given hash salt.
    #[must_use]
    pub fn new(salt: u64) -> Self {
        let buckets: Box<[LockBucket]> =
            (0..LOCK_TABLE_BUCKETS).map(|_| LockBucket::new()).collect();
        info!(buckets = LOCK_TABLE_BUCKETS, "lock ownership table created");
        Self { buckets, salt }
    }

    /// The salt this table hashes with.
    #[must_use]
    pub fn salt(&self) -> u64 {
        self.salt
    }

    /// Record that `tid`, running on `cpu`, now holds `lock_id`.
    ///
    /// Reuses an empty way or the way already tagged for this lock
    /// (re-acquisition refresh). When both ways hold other live locks, way 0
    /// is evicted unconditionally — no LRU. A lock that repeatedly lands in
    /// way 0 of a contended bucket can therefore be systematically evicted;
    /// the cost is a missed hint, not a correctness problem.
    pub fn insert(&self, lock_id: LockId, tid: ThreadId, cpu: CpuId, now_ns: u64) {
        let tag = layout::tag_for(lock_id, self.salt);
        let bucket = &self.buckets[layout::bucket_index(lock_id, self.salt)];

        for way in &bucket.ways {
            let old_tag = way.tag.load(Ordering::Acquire);
            if old_tag == 0 || old_tag == tag {
                Self::write_entry(way, tag, tid, cpu, now_ns);
                return;
            }
        }

        debug!(
            %lock_id,
            evicted_tag = bucket.ways[0].tag.load(Ordering::Relaxed),
            "ownership bucket full, evicting way 0"
        );
        Self::write_entry(&bucket.ways[0], tag, tid, cpu, now_ns);
    }

    fn write_entry(
        way: &crate::layout::LockEntry,
        tag: u32,
        tid: ThreadId,
        cpu: CpuId,
        now_ns: u64,
    ) {
        way.owner_tid.store(tid.get(), Ordering::Relaxed);
        way.owner_cpu.store(cpu.get(), Ordering::Relaxed);
        way.generation.fetch_add(1, Ordering::Relaxed);
        way.acquired_at_ns.store(now_ns, Ordering::Relaxed);
        // Publish last: a reader that sees this tag sees an entry that was
        // live for this lock at some point, even if the payload is torn.
        way.tag.store(tag, Ordering::Release);
    }

    /// Clear the entry for `lock_id`, if present.
    pub fn remove(&self, lock_id: LockId) {
        let tag = layout::tag_for(lock_id, self.salt);
        let bucket = &self.buckets[layout::bucket_index(lock_id, self.salt)];

        for way in &bucket.ways {
            if way.tag.load(Ordering::Acquire) == tag {
                way.tag.store(0, Ordering::Release);
                return;
            }
        }
    }

    /// CPU of the current holder of `lock_id`, if an entry is published.
    #[must_use]
    pub fn lookup_owner_cpu(&self, lock_id: LockId) -> Option<CpuId> {
        let tag = layout::tag_for(lock_id, self.salt);
        let bucket = &self.buckets[layout::bucket_index(lock_id, self.salt)];

        for way in &bucket.ways {
            if way.tag.load(Ordering::Acquire) == tag {
                let cpu = CpuId::new(way.owner_cpu.load(Ordering::Relaxed));
                return cpu.is_some().then_some(cpu);
            }
        }
        None
    }

    /// Best-effort snapshot of the holder of `lock_id`.
    #[must_use]
    pub fn owner(&self, lock_id: LockId) -> Option<OwnerSnapshot> {
        let tag = layout::tag_for(lock_id, self.salt);
        let bucket = &self.buckets[layout::bucket_index(lock_id, self.salt)];

        for way in &bucket.ways {
            if way.tag.load(Ordering::Acquire) == tag {
                return Some(OwnerSnapshot {
                    tid: ThreadId::new(way.owner_tid.load(Ordering::Relaxed)),
                    cpu: CpuId::new(way.owner_cpu.load(Ordering::Relaxed)),
                    generation: way.generation.load(Ordering::Relaxed),
                    acquired_at_ns: way.acquired_at_ns.load(Ordering::Relaxed),
                });
            }
        }
        None
    }

    /// Number of published entries across all buckets (diagnostic).
    #[must_use]
    pub fn live_entries(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.ways.iter())
            .filter(|w| w.tag.load(Ordering::Relaxed) != 0)
            .count()
    }
}

impl std::fmt::Debug for LockOwnershipTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockOwnershipTable")
            .field("buckets", &self.buckets.len())
            .field("live", &self.live_entries())
            .finish()
    }
}
