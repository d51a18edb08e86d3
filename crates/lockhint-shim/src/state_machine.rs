//! The acquisition state machine wrapped around a blocking mutex.
//!
//! ```text
//! FAST_PATH → SPIN → YIELD_WAIT → BLOCKING_FALLBACK
//!      \________\________\______________\→ ACQUIRED
//! ```
//!
//! Every state converges to `ACQUIRED`; `RELEASE` is the separate terminal
//! transition. The machine drives all hint publication: ownership insert +
//! presence enter on acquisition, waiter publish/refresh/clear while
//! contended, and the release-side handoff yield. The wrapped primitive's
//! own semantics are never altered — if every hint write were skipped the
//! caller would still hold the lock exactly as without the shim.

use std::time::Instant;

use lock_api::RawMutex;
use lockhint_tables::HintTables;
use lockhint_types::{CpuId, HintConfig, LockId};
use tracing::debug;

use crate::context::ThreadCx;
use crate::{stats, sys};

/// Busy-wait pause iterations before each spin-phase retry.
pub const SPIN_PAUSE_ITERS: u32 = 10;

/// Why the machine escalated to a blocking acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The yield budget was exhausted first.
    Budget,
    /// The elapsed-time threshold was crossed first.
    Timeout,
}

/// Which path an acquisition took. Returned for statistics and tests; the
/// lock is held either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePath {
    /// First trylock succeeded; no contention handling.
    FastPath,
    /// Acquired during the bounded spin phase.
    Spin {
        /// Spin iterations consumed (1-based).
        iterations: u32,
    },
    /// Acquired during the publish-and-yield phase.
    YieldWait {
        /// Voluntary yields performed.
        yields: u32,
    },
    /// Escalated to the primitive's blocking acquisition.
    BlockingFallback {
        /// Which budget triggered the escalation.
        reason: FallbackReason,
        /// Voluntary yields performed before escalating.
        yields: u32,
    },
}

/// Publish "this thread now holds `lock_id`" into the tables.
///
/// Presence first, then ownership; the two are independent (not
/// transactional) and a reader may observe either alone for a short window.
pub fn publish_acquired(tables: &HintTables, cx: &ThreadCx, lock_id: LockId) {
    tables.presence.enter(cx.tid());
    tables
        .ownership
        .insert(lock_id, cx.tid(), cx.cpu(), sys::now_ns());
}

/// Acquire `raw` with hint publication, degrading from spin to yield to a
/// blocking wait. Returns the path taken; the lock is held on return.
pub fn acquire_hinted<R: RawMutex>(
    raw: &R,
    lock_id: LockId,
    cx: &ThreadCx,
    tables: &HintTables,
    config: &HintConfig,
) -> AcquirePath {
    // FAST_PATH: one non-blocking attempt.
    if raw.try_lock() {
        publish_acquired(tables, cx, lock_id);
        stats::record_acquire(AcquirePath::FastPath);
        return AcquirePath::FastPath;
    }

    // SPIN: bounded trylock retries, each preceded by a relaxation pause.
    let mut spins = 0_u32;
    while spins < config.spin_budget {
        for _ in 0..SPIN_PAUSE_ITERS {
            std::hint::spin_loop();
        }
        spins += 1;
        if raw.try_lock() {
            publish_acquired(tables, cx, lock_id);
            let path = AcquirePath::Spin { iterations: spins };
            stats::record_acquire(path);
            return path;
        }
    }

    // YIELD_WAIT: advertise the wait and hand the quantum back so the
    // scheduler can run us near the owner.
    let start = Instant::now();
    let target = resolve_target(tables, lock_id);
    tables.waiters.publish(cx.tid(), lock_id, target);

    let mut yields = 0_u32;
    loop {
        sys::yield_now();
        yields += 1;

        if raw.try_lock() {
            tables.waiters.clear(cx.tid());
            publish_acquired(tables, cx, lock_id);
            let path = AcquirePath::YieldWait { yields };
            stats::record_acquire(path);
            return path;
        }

        // The owner may have migrated; keep the hint's target current.
        tables
            .waiters
            .refresh_target_cpu(cx.tid(), resolve_target(tables, lock_id));

        let budget_hit = yields >= config.yield_budget;
        let timeout_hit = start.elapsed() >= config.fallback_threshold;
        if budget_hit || timeout_hit {
            // BLOCKING_FALLBACK: withdraw the hint, then let the primitive
            // suspend us.
            let reason = if budget_hit {
                FallbackReason::Budget
            } else {
                FallbackReason::Timeout
            };
            debug!(%lock_id, yields, ?reason, "yield wait exhausted, blocking");
            tables.waiters.clear(cx.tid());
            raw.lock();
            publish_acquired(tables, cx, lock_id);
            let path = AcquirePath::BlockingFallback { reason, yields };
            stats::record_acquire(path);
            return path;
        }
    }
}

/// Non-blocking acquire with hint publication on success. Mirrors the
/// wrapped primitive's trylock exactly.
pub fn try_acquire_hinted<R: RawMutex>(
    raw: &R,
    lock_id: LockId,
    cx: &ThreadCx,
    tables: &HintTables,
) -> bool {
    if raw.try_lock() {
        publish_acquired(tables, cx, lock_id);
        stats::record_acquire(AcquirePath::FastPath);
        true
    } else {
        false
    }
}

/// Release `raw` with hint withdrawal and a best-effort handoff.
///
/// The waiter scan runs before the primitive is released; the single
/// voluntary yield (if a waiter was visible) runs after, encouraging the
/// scheduler to hand the CPU to the waiter rather than letting the
/// releasing thread's remaining quantum run on.
///
/// # Safety
///
/// The calling thread must hold `raw` (same contract as
/// [`RawMutex::unlock`]).
pub unsafe fn release_hinted<R: RawMutex>(
    raw: &R,
    lock_id: LockId,
    cx: &ThreadCx,
    tables: &HintTables,
) {
    let had_waiter = tables.waiters.any_waiter_for(lock_id);

    tables.presence.leave(cx.tid());
    tables.ownership.remove(lock_id);

    // SAFETY: forwarded caller contract — the lock is held.
    unsafe { raw.unlock() };

    if had_waiter {
        stats::record_handoff_yield();
        sys::yield_now();
    }
}

fn resolve_target(tables: &HintTables, lock_id: LockId) -> CpuId {
    tables
        .ownership
        .lookup_owner_cpu(lock_id)
        .unwrap_or(CpuId::NONE)
}
