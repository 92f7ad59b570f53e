use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_registry::{BoxError, SingletonConfig, SingletonRegistry, StorageKey};
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_strong_hit(c: &mut Criterion) {
    let registry = SingletonRegistry::new();
    let key = StorageKey::from("bench-strong");
    registry.set(&key, Arc::new(42u64), SingletonConfig::default()).unwrap();

    c.bench_function("strong_hit_u64", |b| {
        b.iter(|| {
            let v = registry.get::<u64>(&key).unwrap();
            black_box(v);
        })
    });
}

fn bench_weak_hit(c: &mut Criterion) {
    let registry = SingletonRegistry::new();
    let key = StorageKey::from("bench-weak");
    let held = Arc::new(42u64);
    registry.set(&key, held.clone(), SingletonConfig::weak()).unwrap();

    c.bench_function("weak_hit_u64", |b| {
        b.iter(|| {
            let v = registry.get::<u64>(&key).unwrap();
            black_box(v);
        })
    });
    drop(held);
}

fn bench_string_key_normalization(c: &mut Criterion) {
    let registry = SingletonRegistry::new();
    registry.set("bench-string", Arc::new(1u8), SingletonConfig::default()).unwrap();

    c.bench_function("string_key_has", |b| {
        b.iter(|| black_box(registry.has("bench-string")))
    });
}

fn bench_get_or_create_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("get_or_create_cold", |b| {
        b.iter_batched(
            SingletonRegistry::new,
            |registry| {
                let v = registry
                    .get_or_create(
                        "cold",
                        || Arc::new(ExpensiveToCreate { data: (0..1000).collect() }),
                        SingletonConfig::default(),
                    )
                    .unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_async_hit(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let registry = SingletonRegistry::new();
    runtime
        .block_on(registry.get_or_create_async(
            "bench-async",
            || async { Ok::<_, BoxError>(Arc::new(7u32)) },
            SingletonConfig::default(),
        ))
        .unwrap();

    c.bench_function("async_hit_u32", |b| {
        b.iter(|| {
            let v = runtime
                .block_on(registry.get_or_create_async(
                    "bench-async",
                    || async { Ok::<_, BoxError>(Arc::new(0u32)) },
                    SingletonConfig::default(),
                ))
                .unwrap();
            black_box(v);
        })
    });
}

fn bench_registry_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_by_registry_size");
    for size in [10usize, 100, 1000] {
        let registry = SingletonRegistry::new();
        let keys: Vec<StorageKey> = (0..size).map(|i| StorageKey::unique(format!("k{}", i))).collect();
        for key in &keys {
            registry.set(key, Arc::new(0u8), SingletonConfig::default()).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &keys, |b, keys| {
            b.iter(|| black_box(registry.has(&keys[keys.len() / 2])))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_strong_hit,
    bench_weak_hit,
    bench_string_key_normalization,
    bench_get_or_create_cold,
    bench_async_hit,
    bench_registry_size
);
criterion_main!(benches);
