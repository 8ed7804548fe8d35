//! Benchmarks for sensor reply decoding and error translation.
//!
//! Every driver invocation goes through the decoder, and every rejected
//! capture step through the catalog.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench reply_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use printpi_hardware::{DeviceReply, ErrorCatalog, ErrorCode, decode_status};
use std::hint::black_box;

const STATUS_LINES: &[(&str, &str)] = &[
    ("value", "ENROLL SUCCESS ::41"),
    ("error", "ENROLL FAILED ##100c"),
    ("phrase", "ENROLL TIMEOUT"),
    ("bare", "3"),
];

fn bench_decode_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_status");
    group.throughput(Throughput::Elements(1));

    for (name, line) in STATUS_LINES {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(decode_status(black_box(line))));
        });
    }

    group.finish();
}

fn bench_capture_step_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture_step_reply");
    group.throughput(Throughput::Elements(1));

    for (name, line) in STATUS_LINES {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(DeviceReply::capture_step(black_box(line))));
        });
    }

    group.finish();
}

fn bench_catalog_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_translate");
    group.throughput(Throughput::Elements(1));

    let catalog = ErrorCatalog::builtin();
    let codes = [
        ("known", ErrorCode::Numeric(0x100C)),
        ("slot", ErrorCode::Numeric(41)),
        ("unknown", ErrorCode::Numeric(0x2000)),
        ("raw", ErrorCode::Raw("HHHH".to_string())),
    ];

    for (name, code) in &codes {
        group.bench_with_input(BenchmarkId::from_parameter(name), code, |b, code| {
            b.iter(|| black_box(catalog.translate(black_box(code))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_status,
    bench_capture_step_reply,
    bench_catalog_translate
);
criterion_main!(benches);
