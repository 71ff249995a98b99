//! # Admission Benchmarks
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use turnstile::{AdmissionGate, ClientRegistry, LimiterConfig, TokenBucket};

/// Raw bucket arithmetic, no locking
fn bench_bucket_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_consume");
    group.throughput(Throughput::Elements(1));

    group.bench_function("refilling", |b| {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(1_000, 1_000_000.0, start);
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            std::hint::black_box(bucket.consume(start + Duration::from_nanos(tick)))
        });
    });

    group.finish();
}

/// Hot path for a client that already has an entry
fn bench_admit_known_client(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit_known_client");
    group.throughput(Throughput::Elements(1));

    // Refills far faster than a single thread can drain
    let gate = AdmissionGate::new(LimiterConfig::new(1_000, 1_000_000_000.0)).unwrap();
    let _ = gate.admit("10.0.0.1");

    group.bench_function("enabled", |b| {
        b.iter(|| std::hint::black_box(gate.admit("10.0.0.1")));
    });

    group.bench_function("disabled", |b| {
        let now = Instant::now();
        b.iter(|| std::hint::black_box(gate.check("10.0.0.1", false, now)));
    });

    group.finish();
}

/// First sighting of a client: allocation plus insert
fn bench_admit_new_clients(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit_new_clients");

    for clients in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(clients as u64));
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, &clients| {
            let identities: Vec<String> = (0..clients)
                .map(|i| format!("10.{}.{}.{}", i >> 16, (i >> 8) & 0xff, i & 0xff))
                .collect();
            b.iter_batched(
                || AdmissionGate::new(LimiterConfig::default()).unwrap(),
                |gate| {
                    for identity in &identities {
                        std::hint::black_box(gate.admit(identity));
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Sweep cost as the registry grows
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for clients in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, &clients| {
            let t0 = Instant::now();
            let later = t0 + Duration::from_secs(600);
            b.iter_batched(
                || {
                    let registry = ClientRegistry::new();
                    for i in 0..clients {
                        drop(registry.get_or_create(&format!("client-{}", i), 4, 2.0, t0));
                    }
                    registry
                },
                |registry| std::hint::black_box(registry.sweep(Duration::from_secs(180), later)),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Many threads, distinct versus shared identities
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    let threads = 4;
    let per_thread = 1_000;
    group.throughput(Throughput::Elements((threads * per_thread) as u64));

    for shared in [true, false] {
        let name = if shared { "same_client" } else { "distinct_clients" };
        group.bench_function(name, |b| {
            let config = LimiterConfig::new(1_000, 1_000_000_000.0);
            let gate = Arc::new(AdmissionGate::new(config).unwrap());
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let gate = gate.clone();
                        thread::spawn(move || {
                            let identity = if shared {
                                "shared".to_string()
                            } else {
                                format!("client-{}", t)
                            };
                            for _ in 0..per_thread {
                                std::hint::black_box(gate.admit(&identity));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bucket_consume,
    bench_admit_known_client,
    bench_admit_new_clients,
    bench_sweep,
    bench_contention
);
criterion_main!(benches);
