//! Benchmarks for sentinel resolution.
//!
//! Resolution runs once per imported document when sentinel handling is
//! enabled, so its cost scales with manifest size.

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Map, Value, json};
use std::hint::black_box;
use std::time::Duration;

use firebulk::SentinelResolver;

/// A document body with `fields` plain fields and every fourth one a sentinel.
fn document(fields: usize) -> Map<String, Value> {
    (0..fields)
        .map(|i| {
            let value = match i % 4 {
                0 => json!({"kind": "increment", "operand": i}),
                1 => json!({"nested": {"name": format!("field-{i}"), "tags": ["a", "b"]}}),
                2 => json!([1, 2, {"kind": "serverTimestamp"}]),
                _ => json!(format!("value-{i}")),
            };
            (format!("f{i}"), value)
        })
        .collect()
}

/// A chain of maps nested `depth` levels deep.
fn nested(depth: usize) -> Value {
    (0..depth).fold(json!({"kind": "delete"}), |inner, _| json!({ "child": inner }))
}

fn bench_resolve_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_document");
    group.measurement_time(Duration::from_secs(5));
    let resolver = SentinelResolver::new();

    for fields in [4, 64, 512] {
        let data = document(fields);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &data, |b, data| {
            b.iter(|| resolver.resolve_document(black_box(data)));
        });
    }

    group.finish();
}

fn bench_resolve_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_depth");
    let resolver = SentinelResolver::new();

    for depth in [10, 50, 99] {
        let value = nested(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &value, |b, value| {
            b.iter(|| resolver.resolve(black_box(value)));
        });
    }

    // Past the limit: the error path
    let too_deep = nested(150);
    group.bench_function("over_limit", |b| {
        b.iter(|| resolver.resolve(black_box(&too_deep)).is_err());
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_document, bench_resolve_depth);
criterion_main!(benches);
