//! Microbenchmarks for the hint-table hot paths: the operations executed on
//! every lock acquisition/release and on every scheduler decision.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lockhint_tables::{CsPresenceTable, LockOwnershipTable, WaiterHintTable};
use lockhint_types::{CpuId, LockId, ThreadId};

fn bench_ownership(c: &mut Criterion) {
    let table = LockOwnershipTable::new(0xdead_beef);
    let lock = LockId::new(0x7000_1234_5678);
    let tid = ThreadId::new(42);

    c.bench_function("ownership_insert_remove", |b| {
        b.iter(|| {
            table.insert(black_box(lock), tid, CpuId::new(3), 0);
            table.remove(black_box(lock));
        });
    });

    table.insert(lock, tid, CpuId::new(3), 0);
    c.bench_function("ownership_lookup_hit", |b| {
        b.iter(|| table.lookup_owner_cpu(black_box(lock)));
    });
    c.bench_function("ownership_lookup_miss", |b| {
        let absent = LockId::new(0x9999_0000_0001);
        b.iter(|| table.lookup_owner_cpu(black_box(absent)));
    });
}

fn bench_waiter(c: &mut Criterion) {
    let table = WaiterHintTable::new();
    let tid = ThreadId::new(17);
    let lock = LockId::new(0xabcd);

    c.bench_function("waiter_publish_clear", |b| {
        b.iter(|| {
            table.publish(black_box(tid), lock, CpuId::new(1));
            table.clear(black_box(tid));
        });
    });

    table.publish(tid, lock, CpuId::new(1));
    c.bench_function("waiter_resolve", |b| {
        b.iter(|| table.resolve(black_box(tid)));
    });
    c.bench_function("waiter_release_scan", |b| {
        b.iter(|| table.any_waiter_for(black_box(lock)));
    });
}

fn bench_presence(c: &mut Criterion) {
    let table = CsPresenceTable::new();
    let tid = ThreadId::new(5);

    c.bench_function("cs_enter_leave", |b| {
        b.iter(|| {
            table.enter(black_box(tid));
            table.leave(black_box(tid));
        });
    });
    c.bench_function("cs_is_in_cs", |b| {
        b.iter(|| table.is_in_cs(black_box(tid)));
    });
}

criterion_group!(benches, bench_ownership, bench_waiter, bench_presence);
criterion_main!(benches);
