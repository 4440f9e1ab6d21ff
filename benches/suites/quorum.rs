// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use criterion::{BatchSize, Bencher, Criterion};
use rafted::{CommitCondition, Membership};

pub fn bench_quorum(c: &mut Criterion) {
    bench_majority_votes(c);
    bench_joint_votes(c);
}

pub fn bench_majority_votes(c: &mut Criterion) {
    c.bench_function("CommitCondition::majority_votes", |b: &mut Bencher| {
        let conf = Membership::new(1..=5);
        b.iter_batched_ref(
            || CommitCondition::new(&conf),
            |condition| {
                for id in 1..=3 {
                    condition.add_vote(id).unwrap();
                }
                condition.is_committed()
            },
            BatchSize::PerIteration,
        );
    });
}

pub fn bench_joint_votes(c: &mut Criterion) {
    c.bench_function("CommitCondition::joint_votes", |b: &mut Bencher| {
        let conf = Membership::old_new(1..=5, 3..=7);
        b.iter_batched_ref(
            || CommitCondition::new(&conf),
            |condition| {
                for id in 1..=6 {
                    condition.add_vote(id).unwrap();
                }
                condition.is_committed()
            },
            BatchSize::PerIteration,
        );
    });
}
