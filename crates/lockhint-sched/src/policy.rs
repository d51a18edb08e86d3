//! Placement and slice decisions from the hint tables.
//!
//! **Invariant:** every decision entry point in this module is non-blocking,
//! allocation-free, and bounded-time. It is called synchronously from a
//! scheduler runtime on every wakeup/enqueue across all CPUs; the only
//! memory it touches is the fixed-size tables and the per-task
//! classification byte, all via atomic loads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use lockhint_error::HintError;
use lockhint_tables::{AllowedSet, HintTables};
use lockhint_types::{CpuId, ProcessGroupId, SliceConfig, ThreadId};
use tracing::info;

// ---------------------------------------------------------------------------
// Task descriptor + admission cache
// ---------------------------------------------------------------------------

const CLASS_UNKNOWN: u8 = 0;
const CLASS_UNCONTROLLED: u8 = 1;
const CLASS_CONTROLLED: u8 = 2;

/// Memoized admission classification, one byte per task instance.
///
/// Classification happens once, on the first decision for the task, and is
/// never re-evaluated — a group admitted later only affects tasks created
/// (or classified) after the admission.
#[derive(Debug)]
pub struct ClassCache(AtomicU8);

impl ClassCache {
    /// An unclassified cache.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(CLASS_UNKNOWN))
    }
}

impl Default for ClassCache {
    fn default() -> Self {
        Self::new()
    }
}

/// What the policy needs to know about a runnable task.
///
/// One `SchedTask` per task instance: the classification cache rides along
/// with the task for its lifetime.
#[derive(Debug)]
pub struct SchedTask {
    tid: ThreadId,
    pgid: ProcessGroupId,
    class: ClassCache,
}

impl SchedTask {
    /// Describe a task.
    #[must_use]
    pub const fn new(tid: ThreadId, pgid: ProcessGroupId) -> Self {
        Self {
            tid,
            pgid,
            class: ClassCache::new(),
        }
    }

    /// Thread id.
    #[must_use]
    pub const fn tid(&self) -> ThreadId {
        self.tid
    }

    /// Process-group id.
    #[must_use]
    pub const fn pgid(&self) -> ProcessGroupId {
        self.pgid
    }
}

// ---------------------------------------------------------------------------
// EnqueueDecision
// ---------------------------------------------------------------------------

/// Slice assignment returned at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueDecision {
    /// Time slice to grant.
    pub slice: Duration,
    /// Request preemption of the currently running task, so a lock waiter
    /// gets to check the lock quickly.
    pub preempt: bool,
}

// ---------------------------------------------------------------------------
// HintPolicy
// ---------------------------------------------------------------------------

/// The scheduling-policy component: reads the three tables, biases placement
/// and slice length for controlled tasks, and leaves everything else alone.
#[derive(Debug)]
pub struct HintPolicy {
    tables: Arc<HintTables>,
    allowed: Arc<AllowedSet>,
    slices: SliceConfig,
    nr_cpus: u32,
}

impl HintPolicy {
    /// Build a policy over shared tables for a machine with `nr_cpus` CPUs.
    ///
    /// # Errors
    ///
    /// [`HintError::InvalidCpuCount`] when `nr_cpus` is zero.
    pub fn new(
        tables: Arc<HintTables>,
        allowed: Arc<AllowedSet>,
        slices: SliceConfig,
        nr_cpus: u32,
    ) -> Result<Self, HintError> {
        if nr_cpus == 0 {
            return Err(HintError::InvalidCpuCount { nr_cpus });
        }
        Ok(Self {
            tables,
            allowed,
            slices,
            nr_cpus,
        })
    }

    /// The admission set (for wiring the launcher's whitelist calls).
    #[must_use]
    pub fn allowed(&self) -> &Arc<AllowedSet> {
        &self.allowed
    }

    /// Whether `task` is controlled, classifying and memoizing on first use.
    fn is_controlled(&self, task: &SchedTask) -> bool {
        match task.class.0.load(Ordering::Acquire) {
            CLASS_CONTROLLED => true,
            CLASS_UNCONTROLLED => false,
            _ => {
                let controlled = self.allowed.contains(task.pgid);
                let class = if controlled {
                    CLASS_CONTROLLED
                } else {
                    CLASS_UNCONTROLLED
                };
                task.class.0.store(class, Ordering::Release);
                controlled
            }
        }
    }

    /// Resolve a validated waiter-hint target CPU for `task`.
    ///
    /// The slot's own target is used when it names a real CPU in range;
    /// otherwise (sentinel -1, or the owner migrated off the known range)
    /// the ownership table is consulted through the hint's lock identity.
    /// Returns `None` when no in-range CPU can be resolved — the hint is
    /// then treated as absent.
    fn waiter_target(&self, task: &SchedTask) -> Option<CpuId> {
        let hint = self.tables.waiters.resolve(task.tid)?;
        if hint.target_cpu.in_range(self.nr_cpus) {
            return Some(hint.target_cpu);
        }
        let owner_cpu = self.tables.ownership.lookup_owner_cpu(hint.lock_id)?;
        owner_cpu.in_range(self.nr_cpus).then_some(owner_cpu)
    }

    /// CPU placement on wakeup.
    ///
    /// Controlled tasks inside a critical section stay put (cache locality
    /// of the section); controlled tasks with a validated waiter hint are
    /// steered to the owner's CPU; everything else keeps its previous CPU.
    #[must_use]
    pub fn select_cpu(&self, task: &SchedTask, prev_cpu: CpuId) -> CpuId {
        let prev = if prev_cpu.in_range(self.nr_cpus) {
            prev_cpu
        } else {
            CpuId::new(0)
        };

        if !self.is_controlled(task) {
            return prev;
        }
        if self.tables.presence.is_in_cs(task.tid) {
            return prev;
        }
        if let Some(target) = self.waiter_target(task) {
            return target;
        }
        prev
    }

    /// Slice assignment at enqueue time.
    ///
    /// Waiters are checked before critical-section presence: a thread that
    /// is both (nested acquisition) needs the short preempting slice to get
    /// its inner lock, not the long one.
    #[must_use]
    pub fn enqueue(&self, task: &SchedTask) -> EnqueueDecision {
        let baseline = EnqueueDecision {
            slice: self.slices.baseline,
            preempt: false,
        };

        if !self.is_controlled(task) {
            return baseline;
        }
        if self.waiter_target(task).is_some() {
            return EnqueueDecision {
                slice: self.slices.waiter,
                preempt: true,
            };
        }
        if self.tables.presence.is_in_cs(task.tid) {
            return EnqueueDecision {
                slice: self.slices.in_cs(),
                preempt: false,
            };
        }
        baseline
    }

    /// Task-creation hook: a child of a controlled process group is
    /// controlled too.
    pub fn on_task_fork(&self, parent: ProcessGroupId, child: ProcessGroupId) {
        self.allowed.inherit(parent, child);
    }

    /// Log the policy's shape once at attach time.
    pub(crate) fn log_attached(&self) {
        info!(
            nr_cpus = self.nr_cpus,
            baseline_us = self.slices.baseline.as_micros() as u64,
            waiter_us = self.slices.waiter.as_micros() as u64,
            cs_multiplier = self.slices.cs_multiplier,
            "hint policy attached"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockhint_types::LockId;

    const NR_CPUS: u32 = 8;

    struct Fixture {
        tables: Arc<HintTables>,
        policy: HintPolicy,
    }

    fn fixture() -> Fixture {
        let tables = Arc::new(HintTables::new(0));
        let allowed = Arc::new(AllowedSet::new());
        allowed.add(ProcessGroupId::new(100));
        let policy = HintPolicy::new(
            Arc::clone(&tables),
            allowed,
            SliceConfig::default(),
            NR_CPUS,
        )
        .unwrap();
        Fixture { tables, policy }
    }

    fn controlled_task(tid: u32) -> SchedTask {
        SchedTask::new(ThreadId::new(tid), ProcessGroupId::new(100))
    }

    fn uncontrolled_task(tid: u32) -> SchedTask {
        SchedTask::new(ThreadId::new(tid), ProcessGroupId::new(999))
    }

    #[test]
    fn test_zero_cpus_rejected() {
        let tables = Arc::new(HintTables::new(0));
        let err = HintPolicy::new(tables, Arc::new(AllowedSet::new()), SliceConfig::default(), 0)
            .unwrap_err();
        assert!(matches!(err, HintError::InvalidCpuCount { nr_cpus: 0 }));
    }

    #[test]
    fn test_uncontrolled_task_is_untouched() {
        let f = fixture();
        let task = uncontrolled_task(1);

        // Give the task every hint; none of them may apply.
        f.tables.presence.enter(task.tid());
        f.tables.waiters.publish(task.tid(), LockId::new(1), CpuId::new(3));

        assert_eq!(f.policy.select_cpu(&task, CpuId::new(5)), CpuId::new(5));
        let d = f.policy.enqueue(&task);
        assert_eq!(d.slice, SliceConfig::default().baseline);
        assert!(!d.preempt);
    }

    #[test]
    fn test_classification_is_memoized_per_task_instance() {
        let f = fixture();
        let task = SchedTask::new(ThreadId::new(2), ProcessGroupId::new(200));

        // First decision classifies the task as uncontrolled.
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(1)), CpuId::new(1));

        // Admitting the group afterwards must not change this instance.
        f.policy.allowed().add(ProcessGroupId::new(200));
        f.tables.waiters.publish(task.tid(), LockId::new(7), CpuId::new(2));
        assert_eq!(
            f.policy.select_cpu(&task, CpuId::new(1)),
            CpuId::new(1),
            "memoized classification must stick"
        );

        // A fresh instance of the same task sees the new admission.
        let fresh = SchedTask::new(ThreadId::new(2), ProcessGroupId::new(200));
        assert_eq!(f.policy.select_cpu(&fresh, CpuId::new(1)), CpuId::new(2));
    }

    #[test]
    fn test_in_cs_pins_to_previous_cpu() {
        let f = fixture();
        let task = controlled_task(3);

        f.tables.presence.enter(task.tid());
        // Even with a waiter hint published, in-CS wins at placement time.
        f.tables.waiters.publish(task.tid(), LockId::new(5), CpuId::new(6));
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(4)), CpuId::new(4));
    }

    #[test]
    fn test_waiter_is_steered_to_hint_cpu() {
        let f = fixture();
        let task = controlled_task(4);

        f.tables.waiters.publish(task.tid(), LockId::new(5), CpuId::new(6));
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(0)), CpuId::new(6));
    }

    #[test]
    fn test_waiter_sentinel_resolves_through_ownership_table() {
        let f = fixture();
        let task = controlled_task(5);
        let lock = LockId::new(0x1234);

        f.tables
            .ownership
            .insert(lock, ThreadId::new(77), CpuId::new(2), 0);
        f.tables.waiters.publish(task.tid(), lock, CpuId::NONE);

        assert_eq!(f.policy.select_cpu(&task, CpuId::new(0)), CpuId::new(2));
    }

    #[test]
    fn test_out_of_range_target_treated_as_absent() {
        let f = fixture();
        let task = controlled_task(6);

        f.tables
            .waiters
            .publish(task.tid(), LockId::new(9), CpuId::new(64));
        assert_eq!(
            f.policy.select_cpu(&task, CpuId::new(1)),
            CpuId::new(1),
            "target beyond nr_cpus must not be used"
        );
        let d = f.policy.enqueue(&task);
        assert!(!d.preempt, "unresolvable hint gives no waiter slice");
    }

    #[test]
    fn test_invalid_prev_cpu_clamps_to_zero() {
        let f = fixture();
        let task = controlled_task(7);
        assert_eq!(f.policy.select_cpu(&task, CpuId::NONE), CpuId::new(0));
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(1000)), CpuId::new(0));
    }

    #[test]
    fn test_enqueue_waiter_gets_short_preempting_slice() {
        let f = fixture();
        let task = controlled_task(8);

        f.tables.waiters.publish(task.tid(), LockId::new(3), CpuId::new(1));
        let d = f.policy.enqueue(&task);
        assert_eq!(d.slice, SliceConfig::default().waiter);
        assert!(d.preempt);
    }

    #[test]
    fn test_enqueue_in_cs_gets_multiplied_slice() {
        let f = fixture();
        let task = controlled_task(9);

        f.tables.presence.enter(task.tid());
        let d = f.policy.enqueue(&task);
        assert_eq!(d.slice, SliceConfig::default().baseline * 4);
        assert!(!d.preempt);
    }

    #[test]
    fn test_enqueue_waiter_wins_over_in_cs() {
        let f = fixture();
        let task = controlled_task(10);

        f.tables.presence.enter(task.tid());
        f.tables.waiters.publish(task.tid(), LockId::new(3), CpuId::new(1));
        let d = f.policy.enqueue(&task);
        assert_eq!(d.slice, SliceConfig::default().waiter);
        assert!(d.preempt);
    }

    #[test]
    fn test_enqueue_plain_controlled_gets_baseline() {
        let f = fixture();
        let task = controlled_task(11);
        let d = f.policy.enqueue(&task);
        assert_eq!(d.slice, SliceConfig::default().baseline);
        assert!(!d.preempt);
    }

    #[test]
    fn test_fork_inheritance_is_transitive() {
        let f = fixture();
        let parent = ProcessGroupId::new(100); // admitted in fixture()
        let child = ProcessGroupId::new(101);
        let grandchild = ProcessGroupId::new(102);

        f.policy.on_task_fork(parent, child);
        f.policy.on_task_fork(child, grandchild);

        let task = SchedTask::new(ThreadId::new(12), grandchild);
        f.tables.waiters.publish(task.tid(), LockId::new(1), CpuId::new(5));
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(0)), CpuId::new(5));
    }

    #[test]
    fn test_fork_from_unadmitted_parent_is_inert() {
        let f = fixture();
        f.policy
            .on_task_fork(ProcessGroupId::new(500), ProcessGroupId::new(501));
        let task = SchedTask::new(ThreadId::new(13), ProcessGroupId::new(501));
        f.tables.waiters.publish(task.tid(), LockId::new(1), CpuId::new(5));
        assert_eq!(f.policy.select_cpu(&task, CpuId::new(0)), CpuId::new(0));
    }
}
