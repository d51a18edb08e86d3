//! The callback surface an external scheduler runtime drives.
//!
//! The runtime owns invocation timing and thread placement; the policy only
//! supplies decisions. Implementations must never block, allocate, or
//! perform I/O inside `on_cpu_select`/`on_enqueue` — those run in a
//! latency-bounded scheduling context on every wakeup/enqueue.

use lockhint_error::HintError;
use lockhint_types::CpuId;
use tracing::info;

use crate::policy::{EnqueueDecision, HintPolicy, SchedTask};

/// Capability interface between the scheduler runtime and the hint policy.
pub trait SchedulerOps {
    /// Called once when the runtime attaches the policy.
    ///
    /// # Errors
    ///
    /// Attachment-time failures only; the runtime treats an error as fatal
    /// for itself and does not retry.
    fn on_init(&self) -> Result<(), HintError>;

    /// Called once when the runtime detaches.
    fn on_teardown(&self);

    /// CPU placement for `task` waking up, given where it last ran.
    fn on_cpu_select(&self, task: &SchedTask, prev_cpu: CpuId) -> CpuId;

    /// Slice assignment for `task` entering a run queue.
    fn on_enqueue(&self, task: &SchedTask) -> EnqueueDecision;
}

impl SchedulerOps for HintPolicy {
    fn on_init(&self) -> Result<(), HintError> {
        self.log_attached();
        Ok(())
    }

    fn on_teardown(&self) {
        info!("hint policy detached");
    }

    fn on_cpu_select(&self, task: &SchedTask, prev_cpu: CpuId) -> CpuId {
        self.select_cpu(task, prev_cpu)
    }

    fn on_enqueue(&self, task: &SchedTask) -> EnqueueDecision {
        self.enqueue(task)
    }
}
