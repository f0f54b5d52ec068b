use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gorzdrav::prelude::*;

const CANONICAL: &str = "https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22district%22:%225%22%7D,%7B%22lpu%22:%223%22%7D,%7B%22speciality%22:%2249351%22%7D,%7B%22schedule%22:%222229%22%7D,%7B%22doctor%22:%222229%22%7D%5D";

// Multi-key object: the structured pass rejects it, the pattern pass recovers it
const FALLBACK: &str = "https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22lpu%22:%223%22,%22speciality%22:%2249351%22%7D,%7B%22doctor%22:%222229%22%7D%5D";

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("canonical", |b| {
        b.iter(|| {
            let ids = parse(black_box(CANONICAL));
            assert!(ids.is_ok());
        })
    });

    group.bench_function("pattern_fallback", |b| {
        b.iter(|| {
            let ids = parse(black_box(FALLBACK));
            assert!(ids.is_ok());
        })
    });

    group.bench_function("not_a_link", |b| {
        b.iter(|| {
            let ids = parse(black_box("https://example.com/service-free-schedule#x"));
            assert!(ids.is_err());
        })
    });

    group.finish();
}

fn benchmark_generate(c: &mut Criterion) {
    let ids = Identifiers::new(3, "49351").with_district("5").with_doctor("2229");

    c.bench_function("generate_canonical", |b| {
        b.iter(|| generate(black_box(&ids)).unwrap())
    });
}

fn benchmark_classify(c: &mut Criterion) {
    c.bench_function("classify_known_and_unknown", |b| {
        b.iter(|| {
            for code in [37, 38, 39, 603, 616, 9999] {
                black_box(classify(black_box(code), Some("msg")));
            }
        })
    });
}

criterion_group!(benches, benchmark_parse, benchmark_generate, benchmark_classify);
criterion_main!(benches);
