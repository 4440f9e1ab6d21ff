// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use criterion::{BatchSize, Bencher, BenchmarkId, Criterion};
use rafted::{default_logger, result_channel, Entry, Inflight, InflightRequest, Membership};

pub fn bench_inflight(c: &mut Criterion) {
    bench_inflight_add(c);
    bench_inflight_replicate(c);
}

fn filled_inflight(conf: &Membership, entries: u64) -> Inflight {
    let inflight = Inflight::new(conf, &default_logger());
    for index in 1..=entries {
        let (tx, _rx) = result_channel();
        inflight
            .add(InflightRequest::new(Entry::new(index, 1, conf.clone()), tx))
            .unwrap();
    }
    inflight
}

pub fn bench_inflight_add(c: &mut Criterion) {
    c.bench_function("Inflight::add", |b: &mut Bencher| {
        let conf = Membership::new(vec![1, 2, 3, 4, 5]);
        b.iter_batched_ref(
            || (Inflight::new(&conf, &default_logger()), conf.clone()),
            |(inflight, conf)| {
                let (tx, _rx) = result_channel();
                inflight
                    .add(InflightRequest::new(Entry::new(1, 1, conf.clone()), tx))
                    .unwrap();
            },
            BatchSize::PerIteration,
        );
    });
}

pub fn bench_inflight_replicate(c: &mut Criterion) {
    let sizes: Vec<u64> = vec![16, 256, 4096];
    let mut group = c.benchmark_group("Inflight::replicate");
    for size in sizes {
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            |b: &mut Bencher, &size| {
                let conf = Membership::new(vec![1, 2, 3, 4, 5]);
                b.iter_batched_ref(
                    || filled_inflight(&conf, size),
                    |inflight| inflight.replicate(1, size).unwrap(),
                    BatchSize::PerIteration,
                );
            },
        );
    }
    group.finish();
}
