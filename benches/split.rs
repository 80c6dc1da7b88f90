use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use slirc_bot::Message;
use slirc_bot::split::{estimate_prefix_len, split_text, text_budget};
use std::hint::black_box;

// Splitting runs once per outbound PRIVMSG/NOTICE, parsing once per inbound line.

fn split_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let budget = text_budget("PRIVMSG", "#ugjka", estimate_prefix_len("ugjka", "ugjka"));

    let ascii = "All work and no play makes Jack a dull boy. ".repeat(100);
    group.throughput(Throughput::Bytes(ascii.len() as u64));
    group.bench_function("ascii_4k", |b| {
        b.iter(|| split_text(black_box(&ascii), budget))
    });

    let multibyte = "Šķērslis žogā ".repeat(200);
    group.throughput(Throughput::Bytes(multibyte.len() as u64));
    group.bench_function("multibyte_4k", |b| {
        b.iter(|| split_text(black_box(&multibyte), budget))
    });

    group.finish();
}

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let raw = ":sender!user@host PRIVMSG #channel :Hello world";
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("parse_privmsg", |b| {
        b.iter(|| black_box(raw).parse::<Message>().unwrap())
    });

    group.finish();
}

criterion_group!(benches, split_benchmark, parse_benchmark);
criterion_main!(benches);
