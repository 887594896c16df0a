//! Benchmarks for schedule construction and automatic shifting.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loopchain::prelude::*;
use loopchain::transform::compute_shift_tuples_for_fusion;

/// A chain of `len` 2-D stencils, each reading what the previous one wrote.
fn stencil_chain(len: usize) -> LoopChain {
    let domain = || RectangularDomain::new([("1", "N"), ("1", "M")], ["N", "M"]).unwrap();
    let star = || {
        TupleCollection::new(
            [(-1, 0), (1, 0), (0, 0), (0, -1), (0, 1)]
                .iter()
                .map(|&(a, b)| Tuple::new(vec![a, b])),
        )
        .unwrap()
    };
    let center = || TupleCollection::new(vec![Tuple::new(vec![0, 0])]).unwrap();
    let none = || TupleCollection::empty(2).unwrap();
    (0..len)
        .map(|k| {
            LoopNest::with_dataspaces(
                domain(),
                vec![
                    Dataspace::new(format!("A{}", k), star(), none()).unwrap(),
                    Dataspace::new(format!("A{}", k + 1), none(), center()).unwrap(),
                ],
            )
        })
        .collect()
}

fn bench_schedule_construction(c: &mut Criterion) {
    c.bench_function("schedule_16_nests", |b| {
        b.iter(|| Schedule::new(black_box(stencil_chain(16))))
    });
}

fn bench_fuse_and_tile(c: &mut Criterion) {
    let chain = stencil_chain(8);
    c.bench_function("fuse_tile_8_nests", |b| {
        b.iter(|| {
            let mut schedule = Schedule::new(chain.clone());
            schedule
                .apply_all(&[
                    Fusion::new((0..8).collect()).into(),
                    Tile::uniform(0, "32").into(),
                    Wavefront.into(),
                ])
                .unwrap();
            schedule.codegen_to_iscc()
        })
    });
}

fn bench_automatic_shift(c: &mut Criterion) {
    let chain = stencil_chain(6);
    let solver = BranchAndBound::default();
    c.bench_function("automatic_shift_6_nests", |b| {
        b.iter(|| compute_shift_tuples_for_fusion(black_box(&chain), true, &solver).unwrap())
    });
}

criterion_group!(
    benches,
    bench_schedule_construction,
    bench_fuse_and_tile,
    bench_automatic_shift
);
criterion_main!(benches);
