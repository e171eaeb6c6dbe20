//! Throughput Benchmark for FlashKV Core
//!
//! This benchmark measures the parser and the arena under the workloads they
//! see at the front of the server.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashkv_core::arena::Arena;
use flashkv_core::ingress::CommandBuffer;
use flashkv_core::protocol::{encode_command, try_parse_command, CommandParser};

/// Benchmark single-command parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let small = encode_command(&["SET", "key:1", "small_value"]);
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_function("set_small", |b| {
        let mut tokens = Vec::with_capacity(8);
        b.iter(|| {
            let mut parser = CommandParser::new(black_box(&small));
            black_box(parser.try_parse_command(&mut tokens));
        });
    });

    let value = "x".repeat(64 * 1024); // 64KB value
    let large = encode_command(&["SET", "key:1", value.as_str()]);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("set_large", |b| {
        b.iter(|| black_box(try_parse_command(black_box(&large), 0).consumed()));
    });

    let keys: Vec<String> = (0..100).map(|i| format!("key:{}", i)).collect();
    let mut parts = vec!["MGET".to_string()];
    parts.extend(keys);
    let mget = encode_command(&parts);
    group.throughput(Throughput::Bytes(mget.len() as u64));
    group.bench_function("mget_100", |b| {
        let mut tokens = Vec::with_capacity(128);
        b.iter(|| {
            let mut parser = CommandParser::new(black_box(&mget));
            black_box(parser.try_parse_command(&mut tokens));
        });
    });

    // Worst case for callers: the frame is one byte short every time
    let partial = &large[..large.len() - 1];
    group.bench_function("incomplete_large", |b| {
        b.iter(|| black_box(try_parse_command(black_box(partial), 0).consumed()));
    });

    group.finish();
}

/// Benchmark draining a pipelined buffer
fn bench_pipeline(c: &mut Criterion) {
    let mut wire = Vec::new();
    for i in 0..1_000 {
        let key = format!("key:{}", i);
        wire.extend_from_slice(&encode_command(&["SET", key.as_str(), "value"]));
    }

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("parser_1000", |b| {
        let mut tokens = Vec::with_capacity(8);
        b.iter(|| {
            let mut parser = CommandParser::new(black_box(&wire));
            let mut count = 0;
            while parser.try_parse_command(&mut tokens) > 0 {
                count += 1;
            }
            black_box(count)
        });
    });

    group.bench_function("buffer_frames_1000", |b| {
        b.iter(|| {
            let mut buffer = CommandBuffer::new();
            buffer.extend_from_slice(&wire).unwrap();
            let mut count = 0;
            while let Some(frame) = buffer.next_frame().unwrap() {
                black_box(frame);
                count += 1;
            }
            black_box(count)
        });
    });

    group.finish();
}

/// Benchmark arena allocation against the global allocator
fn bench_arena(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("allocate_64b_x1000", |b| {
        let mut arena = Arena::new(64 * 1024);
        b.iter(|| {
            for _ in 0..1_000 {
                black_box(arena.allocate(64));
            }
            arena.reset();
        });
    });

    group.bench_function("vec_64b_x1000", |b| {
        b.iter(|| {
            for _ in 0..1_000 {
                black_box(vec![0u8; 64]);
            }
        });
    });

    group.bench_function("alloc_copy_reply", |b| {
        let mut arena = Arena::new(64 * 1024);
        let reply = b"$11\r\nsmall_value\r\n";
        b.iter(|| {
            for _ in 0..1_000 {
                black_box(arena.alloc_copy(reply));
            }
            arena.reset();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_pipeline, bench_arena);
criterion_main!(benches);
