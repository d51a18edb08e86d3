//! Lock acquisition interception.
//!
//! Wraps a blocking mutual-exclusion primitive with the degradation state
//! machine (fast path → spin → publish-and-yield → blocking fallback) and
//! publishes ownership / waiter / presence hints into the shared tables on
//! the way. The wrapped primitive's correctness is untouched: every hint
//! write can be skipped (passthrough mode) without changing what the caller
//! observes, beyond performance.

pub mod context;
pub mod mutex;
pub mod state_machine;
pub mod stats;
pub mod sys;

pub use context::{HintContext, ThreadCx, global, global_active, init, init_from_env, teardown};
pub use mutex::{HintedMutex, HintedMutexGuard, RawHintedMutex};
pub use state_machine::{
    AcquirePath, FallbackReason, SPIN_PAUSE_ITERS, acquire_hinted, publish_acquired,
    release_hinted, try_acquire_hinted,
};
pub use stats::{ShimStats, snapshot};
