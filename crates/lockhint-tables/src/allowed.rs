//! Admission set: the process groups whose tasks the scheduling policy is
//! allowed to steer.
//!
//! Fixed-capacity open-addressed array of atomic process-group ids.
//! Membership is additive-only for a session: ids are inserted by CAS and
//! never removed, so `contains` can probe lock-free with no tombstone
//! handling. Group id 0 is the empty sentinel and is never a valid member.

use std::sync::atomic::{AtomicU32, Ordering};

use lockhint_types::ProcessGroupId;
use tracing::warn;

use crate::layout::MAX_ALLOWED_GROUPS;

/// The set of controlled process-group identities.
pub struct AllowedSet {
    slots: Box<[AtomicU32]>,
}

impl AllowedSet {
    /// Create an empty set with [`MAX_ALLOWED_GROUPS`] capacity.
    #[must_use]
    pub fn new() -> Self {
        let slots: Box<[AtomicU32]> =
            (0..MAX_ALLOWED_GROUPS).map(|_| AtomicU32::new(0)).collect();
        Self { slots }
    }

    fn probe_start(pgid: ProcessGroupId) -> usize {
        (pgid.get().wrapping_mul(2_654_435_769) as usize) % MAX_ALLOWED_GROUPS
    }

    /// Add `pgid` to the set. Idempotent.
    ///
    /// Returns `false` (with a warning) when the set is full or `pgid` is
    /// the reserved 0 — admission then simply never matches that group;
    /// never an error.
    pub fn add(&self, pgid: ProcessGroupId) -> bool {
        if pgid.get() == 0 {
            return false;
        }
        let start = Self::probe_start(pgid);
        for offset in 0..MAX_ALLOWED_GROUPS {
            let slot = &self.slots[(start + offset) % MAX_ALLOWED_GROUPS];
            loop {
                let current = slot.load(Ordering::Acquire);
                if current == pgid.get() {
                    return true;
                }
                if current != 0 {
                    break; // occupied by another group, probe forward
                }
                match slot.compare_exchange(
                    0,
                    pgid.get(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return true,
                    // Raced with another insert into this slot; re-read the
                    // same slot (the winner may have inserted our pgid).
                    Err(_) => {}
                }
            }
        }
        warn!(%pgid, capacity = MAX_ALLOWED_GROUPS, "allowed set full, group not admitted");
        false
    }

    /// Whether `pgid` is a member. Lock-free, allocation-free, bounded.
    #[must_use]
    pub fn contains(&self, pgid: ProcessGroupId) -> bool {
        if pgid.get() == 0 {
            return false;
        }
        let start = Self::probe_start(pgid);
        for offset in 0..MAX_ALLOWED_GROUPS {
            let slot = &self.slots[(start + offset) % MAX_ALLOWED_GROUPS];
            match slot.load(Ordering::Acquire) {
                0 => return false, // additive-only: empty slot ends the probe chain
                v if v == pgid.get() => return true,
                _ => {}
            }
        }
        false
    }

    /// Copy-on-fork inheritance: admit `child` iff `parent` is a member.
    ///
    /// Idempotent; returns whether the child is (now) a member.
    pub fn inherit(&self, parent: ProcessGroupId, child: ProcessGroupId) -> bool {
        if self.contains(parent) {
            self.add(child)
        } else {
            false
        }
    }

    /// Number of members (diagnostic).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.load(Ordering::Relaxed) != 0)
            .count()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AllowedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AllowedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowedSet")
            .field("len", &self.len())
            .field("capacity", &MAX_ALLOWED_GROUPS)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_and_contains() {
        let set = AllowedSet::new();
        let pg = ProcessGroupId::new(1234);

        assert!(!set.contains(pg));
        assert!(set.add(pg));
        assert!(set.contains(pg));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let set = AllowedSet::new();
        let pg = ProcessGroupId::new(77);

        assert!(set.add(pg));
        assert!(set.add(pg));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_zero_pgid_rejected() {
        let set = AllowedSet::new();
        assert!(!set.add(ProcessGroupId::new(0)));
        assert!(!set.contains(ProcessGroupId::new(0)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_inherit_propagates_only_from_members() {
        let set = AllowedSet::new();
        let parent = ProcessGroupId::new(10);
        let child = ProcessGroupId::new(20);
        let orphan = ProcessGroupId::new(30);

        assert!(!set.inherit(parent, child), "parent not admitted yet");
        assert!(!set.contains(child));

        set.add(parent);
        assert!(set.inherit(parent, child));
        assert!(set.contains(child));

        // Transitive: child is now a member, its own children inherit.
        assert!(set.inherit(child, orphan));
        assert!(set.contains(orphan));
    }

    #[test]
    fn test_full_set_degrades_gracefully() {
        let set = AllowedSet::new();
        for i in 0..MAX_ALLOWED_GROUPS {
            assert!(set.add(ProcessGroupId::new(u32::try_from(i).unwrap() + 1)));
        }
        let overflow = ProcessGroupId::new(9999);
        assert!(!set.add(overflow));
        assert!(!set.contains(overflow));
        assert_eq!(set.len(), MAX_ALLOWED_GROUPS);
    }

    #[test]
    fn test_concurrent_adds_converge() {
        let set = Arc::new(AllowedSet::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for i in 1..=100_u32 {
                        assert!(set.add(ProcessGroupId::new(i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(set.len(), 100, "concurrent duplicate adds must not double-insert");
        for i in 1..=100_u32 {
            assert!(set.contains(ProcessGroupId::new(i)));
        }
    }
}
