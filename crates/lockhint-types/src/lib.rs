//! Core identity types and configuration for the lockhint workspace.
//!
//! This crate is intentionally small: it defines the newtypes shared by the
//! hint tables, the acquisition shim, and the scheduling policy, plus the
//! tunable configuration those components consume.

pub mod config;

pub use config::{HintConfig, SliceConfig};

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ThreadId
// ---------------------------------------------------------------------------

/// Kernel thread id of an application thread.
///
/// Used to index the waiter and critical-section tables (`tid mod slots`).
/// Distinct tids may alias the same slot; consumers validate the stored tid
/// before trusting a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Wrap a raw tid.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw tid value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CpuId
// ---------------------------------------------------------------------------

/// A logical CPU number, or the "unknown" sentinel.
///
/// `-1` means "no CPU resolved"; hint consumers fall back to their default
/// placement when they see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CpuId(i32);

impl CpuId {
    /// Sentinel for "no CPU known".
    pub const NONE: Self = Self(-1);

    /// Wrap a raw CPU number (negative values collapse to [`CpuId::NONE`]).
    #[inline]
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        if raw < 0 { Self::NONE } else { Self(raw) }
    }

    /// The raw value (`-1` for [`CpuId::NONE`]).
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Whether this id names a real CPU.
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 >= 0
    }

    /// Whether this id is a valid CPU on a machine with `nr_cpus` CPUs.
    #[inline]
    #[must_use]
    pub fn in_range(self, nr_cpus: u32) -> bool {
        self.0 >= 0 && (self.0 as u32) < nr_cpus
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_some() {
            write!(f, "cpu:{}", self.0)
        } else {
            f.write_str("cpu:?")
        }
    }
}

// ---------------------------------------------------------------------------
// LockId
// ---------------------------------------------------------------------------

/// Identity of a mutual-exclusion primitive: the address of the wrapped
/// primitive, used as the hash key for the hint tables.
///
/// Lock ids are compared only through their salted hash/tag projection, so
/// address reuse after a lock is destroyed is tolerated (a stale entry is
/// overwritten on the next acquisition that collides with it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(u64);

impl LockId {
    /// Wrap a raw lock identity.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Identity of a primitive given by reference.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized>(primitive: &T) -> Self {
        Self(std::ptr::from_ref(primitive).cast::<u8>() as u64)
    }

    /// The raw identity value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock:{:#x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ProcessGroupId
// ---------------------------------------------------------------------------

/// Process-group identity used for admission control.
///
/// `0` is reserved as the empty sentinel in the allowed set and is never a
/// valid member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessGroupId(u32);

impl ProcessGroupId {
    /// Wrap a raw process-group id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pgid:{}", self.0)
    }
}
