//! Thin platform layer: thread identity, current CPU, voluntary yield, and
//! the monotonic clock used for hint timestamps.

use std::time::Instant;

use lockhint_types::{CpuId, ThreadId};

/// Kernel thread id of the calling thread.
#[cfg(target_os = "linux")]
#[must_use]
pub fn current_tid() -> ThreadId {
    // SAFETY: gettid has no preconditions and cannot fail.
    let tid = unsafe { libc::gettid() };
    ThreadId::new(u32::try_from(tid).unwrap_or(0))
}

/// Stable per-thread id derived from the runtime thread id (platforms
/// without `gettid`).
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn current_tid() -> ThreadId {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::hash::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    ThreadId::new((hasher.finish() & u64::from(u32::MAX)) as u32)
}

/// CPU the calling thread is currently running on.
#[cfg(target_os = "linux")]
#[must_use]
pub fn current_cpu() -> CpuId {
    // SAFETY: sched_getcpu has no preconditions; it returns -1 on error,
    // which maps onto the CpuId::NONE sentinel.
    CpuId::new(unsafe { libc::sched_getcpu() })
}

/// CPU of the calling thread (unknown off Linux).
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn current_cpu() -> CpuId {
    CpuId::NONE
}

/// Voluntarily relinquish the remaining scheduling quantum.
pub fn yield_now() {
    #[cfg(unix)]
    // SAFETY: sched_yield has no preconditions.
    unsafe {
        libc::sched_yield();
    }
    #[cfg(not(unix))]
    std::thread::yield_now();
}

/// Monotonic nanoseconds relative to a process-wide epoch.
#[must_use]
pub fn now_ns() -> u64 {
    static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    #[allow(clippy::cast_possible_truncation)] // clamped to u64::MAX
    {
        epoch.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tid_is_stable_within_a_thread() {
        assert_eq!(current_tid(), current_tid());
    }

    #[test]
    fn test_tids_differ_across_threads() {
        let here = current_tid();
        let there = std::thread::spawn(current_tid).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_now_ns_is_monotonic() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }
}
