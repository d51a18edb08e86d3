//! Process-wide shim statistics.
//!
//! Plain relaxed counters bumped on the acquisition paths; cheap enough to
//! leave always-on. Readers take [`snapshot`]s and diff them.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::state_machine::AcquirePath;

static FAST_PATH: AtomicU64 = AtomicU64::new(0);
static SPIN: AtomicU64 = AtomicU64::new(0);
static YIELD_WAIT: AtomicU64 = AtomicU64::new(0);
static BLOCKING_FALLBACK: AtomicU64 = AtomicU64::new(0);
static HANDOFF_YIELDS: AtomicU64 = AtomicU64::new(0);
static PASSTHROUGH: AtomicU64 = AtomicU64::new(0);

/// Counter totals at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShimStats {
    /// Acquisitions that succeeded on the first trylock.
    pub fast_path: u64,
    /// Acquisitions that succeeded during the spin phase.
    pub spin: u64,
    /// Acquisitions that succeeded during the yield phase.
    pub yield_wait: u64,
    /// Acquisitions that escalated to a blocking lock.
    pub blocking_fallback: u64,
    /// Release-side yields performed because a waiter was visible.
    pub handoff_yields: u64,
    /// Operations that ran in passthrough mode (no hints).
    pub passthrough: u64,
}

/// Record which path an acquisition took.
pub fn record_acquire(path: AcquirePath) {
    let counter = match path {
        AcquirePath::FastPath => &FAST_PATH,
        AcquirePath::Spin { .. } => &SPIN,
        AcquirePath::YieldWait { .. } => &YIELD_WAIT,
        AcquirePath::BlockingFallback { .. } => &BLOCKING_FALLBACK,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Record a release-side handoff yield.
pub fn record_handoff_yield() {
    HANDOFF_YIELDS.fetch_add(1, Ordering::Relaxed);
}

/// Record a passthrough operation (context disabled or tables unavailable).
pub fn record_passthrough() {
    PASSTHROUGH.fetch_add(1, Ordering::Relaxed);
}

/// Current counter totals.
#[must_use]
pub fn snapshot() -> ShimStats {
    ShimStats {
        fast_path: FAST_PATH.load(Ordering::Relaxed),
        spin: SPIN.load(Ordering::Relaxed),
        yield_wait: YIELD_WAIT.load(Ordering::Relaxed),
        blocking_fallback: BLOCKING_FALLBACK.load(Ordering::Relaxed),
        handoff_yields: HANDOFF_YIELDS.load(Ordering::Relaxed),
        passthrough: PASSTHROUGH.load(Ordering::Relaxed),
    }
}
