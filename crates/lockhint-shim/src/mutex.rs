//! Drop-in mutex wrapper that feeds the hint tables.
//!
//! [`RawHintedMutex`] wraps any [`lock_api::RawMutex`] and is itself a
//! `RawMutex`, so the standard `lock_api::Mutex`/`MutexGuard` machinery
//! provides the caller-facing surface unchanged. Lock identity is the
//! address of the wrapped raw primitive.
//!
//! When no process-wide context is installed (or it was torn down, or the
//! tables were never configured) every operation forwards straight to the
//! inner primitive: same return values, same blocking behavior, no hint
//! traffic.

use lock_api::RawMutex;
use lockhint_types::LockId;

use crate::context::{self, ThreadCx};
use crate::{state_machine, stats};

/// A raw mutex that publishes contention hints around an inner raw mutex.
pub struct RawHintedMutex<R> {
    inner: R,
}

impl<R> RawHintedMutex<R> {
    /// The identity this mutex publishes hints under.
    fn lock_id(&self) -> LockId {
        LockId::of(&self.inner)
    }
}

// SAFETY: all locking semantics are delegated to the inner RawMutex; the
// hint traffic around the delegation never fakes an acquisition or skips a
// release.
unsafe impl<R: RawMutex> RawMutex for RawHintedMutex<R> {
    const INIT: Self = Self { inner: R::INIT };

    type GuardMarker = R::GuardMarker;

    fn lock(&self) {
        match context::global_active() {
            Some((tables, config)) => {
                let cx = ThreadCx::current();
                state_machine::acquire_hinted(&self.inner, self.lock_id(), &cx, tables, config);
            }
            None => {
                stats::record_passthrough();
                self.inner.lock();
            }
        }
    }

    fn try_lock(&self) -> bool {
        match context::global_active() {
            Some((tables, _)) => {
                let cx = ThreadCx::current();
                state_machine::try_acquire_hinted(&self.inner, self.lock_id(), &cx, tables)
            }
            None => {
                stats::record_passthrough();
                self.inner.try_lock()
            }
        }
    }

    unsafe fn unlock(&self) {
        match context::global_active() {
            Some((tables, _)) => {
                let cx = ThreadCx::current();
                // SAFETY: forwarded caller contract — the lock is held.
                unsafe {
                    state_machine::release_hinted(&self.inner, self.lock_id(), &cx, tables);
                }
            }
            // SAFETY: forwarded caller contract — the lock is held.
            None => unsafe { self.inner.unlock() },
        }
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// A mutex whose contention is visible to the scheduling policy.
pub type HintedMutex<T> = lock_api::Mutex<RawHintedMutex<parking_lot::RawMutex>, T>;

/// RAII guard for [`HintedMutex`].
pub type HintedMutexGuard<'a, T> =
    lock_api::MutexGuard<'a, RawHintedMutex<parking_lot::RawMutex>, T>;
