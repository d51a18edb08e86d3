//! Advisory lock-contention scheduling hints.
//!
//! `lockhint` steers CPU placement and time-slice allocation around mutex
//! contention without touching the mutex's correctness guarantees:
//!
//! - threads waiting for a lock are steered toward the CPU holding it,
//! - a thread inside a critical section is pinned and granted a longer
//!   slice so it is not preempted mid-section,
//! - a thread spinning for a lock degrades gracefully to a blocking wait.
//!
//! The moving parts: the acquisition shim ([`HintedMutex`],
//! [`acquire_hinted`]) publishes into three lock-free shared tables
//! ([`HintTables`]), and the scheduling policy ([`HintPolicy`]) reads them
//! inside an external scheduler runtime's callbacks ([`SchedulerOps`]).
//! Every hint is advisory: stale, torn, or absent hints degrade placement
//! quality, never mutual exclusion.

pub use lockhint_error::HintError;
pub use lockhint_sched::{EnqueueDecision, HintPolicy, SchedTask, SchedulerOps};
pub use lockhint_shim::{
    AcquirePath, FallbackReason, HintContext, HintedMutex, HintedMutexGuard, RawHintedMutex,
    ShimStats, ThreadCx, acquire_hinted, global, init, init_from_env, release_hinted,
    snapshot, teardown, try_acquire_hinted,
};
pub use lockhint_tables::{
    AllowedSet, CsPresenceTable, HintTables, LockOwnershipTable, OwnerSnapshot, WaiterHint,
    WaiterHintTable,
};
pub use lockhint_types::{
    CpuId, HintConfig, LockId, ProcessGroupId, SliceConfig, ThreadId,
};
