//! Criterion benchmarks for the memsat engine.
//!
//! Measures the leaf algebra (cloud union, model combination) and a full
//! resolution of the Leibniz-equality formula at different pool sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memsat::{Calculator, Cloud, Model, Step, Var};

fn sparse_cloud(seed: u64, n: u64) -> Cloud {
    let mut c = Cloud::empty();
    for k in 0..n {
        c |= &Cloud::singleton(seed + 17 * k);
    }
    c
}

fn bench_cloud_union(c: &mut Criterion) {
    let a = sparse_cloud(3, 40);
    let b = sparse_cloud(11, 40);
    c.bench_function("cloud_union", |bench| {
        bench.iter(|| black_box(&a) | black_box(&b))
    });
}

fn bench_model_combine(c: &mut Criterion) {
    let m0 = Model::atom(1, true, false, false, false);
    let m1 = Model::atom(2, false, false, false, false);
    c.bench_function("model_conjoin", |bench| {
        bench.iter(|| black_box(&m0).conjoin(black_box(&m1)))
    });
    c.bench_function("model_incompatibility", |bench| {
        bench.iter(|| black_box(&m0).is_incompatible(black_box(&m1)))
    });
}

fn leibniz(calc: &mut Calculator<&'static str>) -> Step<&'static str> {
    fn eq(c: &mut Calculator<&'static str>, x: Var, y: Var, member: bool) -> Step<&'static str> {
        c.for_all(move |c, _z| {
            c.op_bimp(move |c| c.atom(x, member), move |c| c.atom(y, member))
        })
    }
    calc.for_all(|c, x| {
        c.for_all(move |c, y| {
            c.op_imp(move |c| eq(c, x, y, false), move |c| eq(c, x, y, true))
        })
    })
}

fn bench_leibniz(c: &mut Criterion) {
    let mut group = c.benchmark_group("leibniz");
    for n_workers in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("resolve", n_workers),
            &n_workers,
            |bench, &n| {
                bench.iter(|| {
                    let mut calc: Calculator<&'static str> = Calculator::with_workers(n);
                    leibniz(&mut calc).unwrap();
                    black_box(calc.is_satisfiable())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cloud_union,
    bench_model_combine,
    bench_leibniz
);
criterion_main!(benches);
