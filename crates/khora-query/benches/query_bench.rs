use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use khora_query::{EntityId, World};
use serde_json::json;

fn populate(world: &World) -> Vec<EntityId> {
    (0..10_000)
        .map(|i| {
            if i % 2 == 0 {
                world.spawn([("position", json!(i)), ("health", json!(i % 7))])
            } else {
                world.spawn([("position", json!(i))])
            }
        })
        .collect()
}

fn bench_queries(c: &mut Criterion) {
    let world = World::new();
    let ids = populate(&world);

    let alive = world
        .query()
        .flag(["position", "health"])
        .filter("health", "!=", 0);
    alive.evaluate().unwrap();

    let mut group = c.benchmark_group("Query Graph");

    group.bench_function("Cached evaluation (no changes)", |b| {
        b.iter(|| black_box(alive.evaluate().unwrap().len()));
    });

    let mut tick = 0u64;
    group.bench_function("Incremental evaluation (one change)", |b| {
        b.iter(|| {
            tick += 1;
            world.set_component(ids[(tick as usize * 2) % ids.len()], "health", json!(tick % 7));
            black_box(alive.evaluate().unwrap().len())
        });
    });

    group.bench_function("Fresh chain (full scan)", |b| {
        b.iter(|| {
            let cursor = world.query().flag(["health"]).filter("health", "==", 3);
            black_box(cursor.evaluate().unwrap().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
