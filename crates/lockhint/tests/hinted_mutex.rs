//! Drop-in `HintedMutex` behavior with the process-wide context installed.
//!
//! These tests share one process, and the context is single-assignment, so
//! a common helper installs it once with tables allocated.

use std::sync::Arc;

use lockhint::{HintConfig, HintTables, HintedMutex};

fn ensure_context() {
    let config = HintConfig::default();
    let tables = Arc::new(HintTables::new(config.hash_salt));
    // First caller wins; AlreadyInitialized from later callers is fine.
    let _ = lockhint::init(config, Some(tables));
}

#[test]
fn test_fast_path_is_counted() {
    ensure_context();
    let m: HintedMutex<u32> = HintedMutex::new(7);

    let before = lockhint::snapshot();
    {
        let guard = m.lock();
        assert_eq!(*guard, 7);
    }
    let after = lockhint::snapshot();
    assert!(
        after.fast_path > before.fast_path,
        "uncontended lock must take the fast path"
    );
}

#[test]
fn test_try_lock_semantics_match_the_primitive() {
    ensure_context();
    let m: HintedMutex<()> = HintedMutex::new(());

    let guard = m.lock();
    assert!(m.try_lock().is_none());
    drop(guard);
    let g2 = m.try_lock();
    assert!(g2.is_some());
}

#[test]
fn test_heavy_contention_preserves_exclusion() {
    ensure_context();
    const THREADS: usize = 8;
    const ITERS: u64 = 2_000;

    let m: Arc<HintedMutex<u64>> = Arc::new(HintedMutex::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for _ in 0..ITERS {
                    *m.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*m.lock(), THREADS as u64 * ITERS);

    // All transient hints must have drained with the last release.
    let ctx = lockhint::global().expect("context installed");
    let tables = ctx.tables().expect("tables configured");
    assert_eq!(tables.waiters.active_count(), 0);
}
