//! Benchmarks for line accumulation and classification.
//!
//! ```bash
//! cargo bench -p blemate-driver
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use blemate_driver::mock::{ManualClock, ScriptedModule};
use blemate_driver::BleMate;
use blemate_protocol::{LineCodec, Response, ResponseRule};

fn scan_burst(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("SCN=0 {:012X} -61 0201060303AAFE\n\r", i % 3))
        .collect::<String>()
        .into_bytes()
}

/// Raw byte-by-byte accumulation.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_codec");

    for lines in [1usize, 16, 256].iter() {
        let data = scan_burst(*lines);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("push_bytes", lines), &data, |b, data| {
            b.iter(|| {
                let mut codec = LineCodec::new();
                let mut count = 0;
                for &byte in data {
                    if codec.push_byte(byte).is_some() {
                        count += 1;
                    }
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

/// Accumulation plus classification under the scan rule.
fn bench_classify(c: &mut Criterion) {
    let data = scan_burst(64);
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(64));
    group.bench_function("scan_rule", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new();
            codec
                .push(&data)
                .iter()
                .map(|line| Response::classify(line, &ResponseRule::Scan))
                .filter(|r| matches!(r, Response::ScanReport { .. }))
                .count()
        });
    });
    group.finish();
}

/// A whole version query through the dispatcher.
fn bench_exchange(c: &mut Criterion) {
    c.bench_function("own_address_exchange", |b| {
        b.iter(|| {
            let module = ScriptedModule::new().expect(
                "VER",
                "Melody Smart v2.6.0\n\rBluetooth Address 0123456789AB\n\rOK\n\r",
            );
            let mut ble = BleMate::with_clock(module, ManualClock::new());
            black_box(ble.own_address().is_ok())
        });
    });
}

criterion_group!(benches, bench_codec, bench_classify, bench_exchange);
criterion_main!(benches);
