//! Performance benchmarks for the Breach Radar correlators.
//!
//! Run with: cargo bench

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use breach_radar::domain::format_record_count;
use breach_radar::{
    BreachMetadata, CorrelationConfig, ExactMatchCorrelator, IdentityField, InMemoryBreachStore,
    SearchRequest, SensitiveCandidateCorrelator, SensitiveSearchRequest,
};

/// Deterministic 64-char hex hash for record `i` of breach `b`.
fn hash(b: usize, i: usize) -> String {
    format!("{:016x}{:016x}{:032x}", b, i, (b * 7919) ^ (i * 104_729))
}

/// Store with `breaches` datasets of `records` hashes per field.
fn build_store(breaches: usize, records: usize) -> Arc<InMemoryBreachStore> {
    let mut store = InMemoryBreachStore::new();
    for b in 0..breaches {
        let name = format!("breach_{b}");
        store = store
            .with_breach(BreachMetadata::new(
                name.as_str(),
                format!("Breach {b}"),
                NaiveDate::from_ymd_opt(2015 + (b % 8) as i32, 1, 1).unwrap(),
                records as u64,
                [
                    IdentityField::Email,
                    IdentityField::Username,
                    IdentityField::Password,
                ],
            ))
            .unwrap();
        for field in [
            IdentityField::Email,
            IdentityField::Username,
            IdentityField::Password,
        ] {
            store = store
                .with_hashes(&name, field, (0..records).map(|i| hash(b, i)))
                .unwrap();
        }
    }
    Arc::new(store)
}

/// Benchmark exact correlation across a growing catalog
fn bench_exact_correlation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("exact_correlation");

    for breaches in [1, 10, 50].iter() {
        let store = build_store(*breaches, 1_000);
        let correlator =
            ExactMatchCorrelator::new(store.clone(), store, CorrelationConfig::default());
        let request = SearchRequest::new([
            (IdentityField::Email, hash(0, 42)),
            (IdentityField::Username, hash(0, 7)),
        ]);

        group.throughput(Throughput::Elements(*breaches as u64));
        group.bench_with_input(
            BenchmarkId::new("find_matches", breaches),
            &request,
            |b, request| {
                b.to_async(&rt)
                    .iter(|| async { black_box(correlator.find_matches(request).await.unwrap()) });
            },
        );
    }

    group.finish();
}

/// Benchmark prefix lookups with wide and narrow prefixes
fn bench_sensitive_correlation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = build_store(10, 5_000);
    let correlator =
        SensitiveCandidateCorrelator::new(store.clone(), store, CorrelationConfig::default());

    let mut group = c.benchmark_group("sensitive_correlation");
    for prefix_len in [5usize, 16, 24].iter() {
        let request = SensitiveSearchRequest::new("password", &hash(3, 17)[..*prefix_len]);
        group.bench_with_input(
            BenchmarkId::new("search", prefix_len),
            &request,
            |b, request| {
                b.to_async(&rt)
                    .iter(|| async { black_box(correlator.search(request).await.unwrap()) });
            },
        );
    }

    group.finish();
}

/// Benchmark record count formatting
fn bench_format_record_count(c: &mut Criterion) {
    c.bench_function("format_record_count", |b| {
        b.iter(|| {
            for n in [999u64, 1_500, 700_000_000, 1_619_000_000] {
                black_box(format_record_count(black_box(n)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_exact_correlation,
    bench_sensitive_correlation,
    bench_format_record_count
);
criterion_main!(benches);
