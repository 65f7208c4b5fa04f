//! Benchmarks for playforge core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use playforge::core::inventory;
use playforge::export;
use playforge::{build, compose, Environment, RoleCatalog, RoleId, Selection};

fn selection_of(n: usize) -> Selection {
    Selection::new(RoleId::BUILTIN.iter().take(n).cloned()).unwrap()
}

fn bench_compose(c: &mut Criterion) {
    let catalog = RoleCatalog::builtin();
    let mut group = c.benchmark_group("compose");
    for n in [1, 4, 8, 13] {
        let selection = selection_of(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &selection, |b, selection| {
            b.iter(|| {
                let project = compose(&catalog, black_box(selection), Environment::Production);
                black_box(project.unwrap());
            });
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let catalog = RoleCatalog::builtin();
    let selection = selection_of(13);
    c.bench_function("build_full_catalog", |b| {
        b.iter(|| {
            let project = build(&catalog, black_box(&selection), Environment::Staging);
            black_box(project.unwrap());
        });
    });
}

fn bench_inventory(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory");
    group.bench_function("build", |b| {
        b.iter(|| black_box(inventory::build_inventory(black_box(Environment::Production))));
    });
    group.bench_function("cached_clone", |b| {
        b.iter(|| black_box(inventory::cached(black_box(Environment::Production)).clone()));
    });
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let catalog = RoleCatalog::builtin();
    let mut group = c.benchmark_group("fingerprint");
    for n in [1, 13] {
        let project = build(&catalog, &selection_of(n), Environment::Production).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &project, |b, project| {
            b.iter(|| black_box(black_box(project).fingerprint()));
        });
    }
    group.finish();
}

fn bench_archive(c: &mut Criterion) {
    let catalog = RoleCatalog::builtin();
    let project = build(&catalog, &selection_of(13), Environment::Production).unwrap();

    let mut group = c.benchmark_group("archive");
    group.bench_function("zip", |b| {
        b.iter(|| black_box(export::zip_bytes(black_box(&project), "bench").unwrap()));
    });
    group.bench_function("tar_gz", |b| {
        b.iter(|| black_box(export::tar_gz_bytes(black_box(&project), "bench").unwrap()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compose,
    bench_build,
    bench_inventory,
    bench_fingerprint,
    bench_archive
);
criterion_main!(benches);
