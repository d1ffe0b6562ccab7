//! Benchmarks for the scan-stream decode pipeline.
//!
//! Covers the two hot paths of a poll cycle: AD structure decoding and
//! line aggregation, using the same payload shapes the unit tests use.

use atble_listener::{LineFramer, PollAggregator, advertisement, hex};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// A realistic advertisement: flags, 16-bit service UUIDs, service data,
/// and a shortened name.
fn adv_payload() -> Vec<u8> {
    let mut buffer = vec![
        0x02, 0x01, 0x06, // Flags
        0x03, 0x03, 0xAA, 0xFE, // 16-bit service UUIDs
        0x0B, 0x16, 0xAA, 0xFE, 0x00, 0x10, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // service data
    ];
    buffer.extend_from_slice(&[0x05, 0x08]);
    buffer.extend_from_slice(b"mcan");
    buffer
}

fn scan_chunk(devices: usize) -> Vec<u8> {
    let payload = hex::to_hex(&adv_payload());
    let mut chunk = Vec::new();
    for i in 0..devices {
        chunk.extend_from_slice(
            format!(
                "MAC:AA:BB:CC:DD:{:02X}:{:02X},RSSI:-{},ADV:{payload}\r\n",
                i / 256,
                i % 256,
                40 + i % 50,
            )
            .as_bytes(),
        );
    }
    chunk
}

fn bench_advertisement_decode(c: &mut Criterion) {
    let payload = adv_payload();
    let mut group = c.benchmark_group("advertisement_decode");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("full_payload", |b| {
        b.iter(|| advertisement::decode(black_box(&payload)).unwrap())
    });
    group.finish();
}

fn bench_poll_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_cycle");
    for devices in [1usize, 10, 50] {
        let chunk = scan_chunk(devices);
        group.throughput(Throughput::Bytes(chunk.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(devices),
            &chunk,
            |b, chunk| {
                b.iter(|| {
                    let mut framer = LineFramer::new();
                    let mut aggregator = PollAggregator::new();
                    for line in framer.push(black_box(chunk)) {
                        aggregator.push_line(&line);
                    }
                    black_box(aggregator.finish())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_advertisement_decode, bench_poll_cycle);
criterion_main!(benches);
