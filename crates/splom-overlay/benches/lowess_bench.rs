//! Benchmarks for overlay setup cost.
//!
//! `lowess` setup dominates reconciliation time on large samples, so this
//! measures it across sample sizes and windows, with `diagonal` as the
//! cheap baseline.
//!
//! Run with: cargo bench -p splom-overlay --bench lowess_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use splom_core::{Dataset, DatasetView, Size};
use splom_overlay::{CellBinding, CellId, OverlayFactory};

fn binding(rows: usize) -> CellBinding {
    // Deterministic wiggle so the fit has something to do.
    let xs: Vec<f64> = (0..rows).map(|i| i as f64 * 0.01).collect();
    let ys: Vec<f64> = xs.iter().map(|x| x.sin() * 3.0 + (x * 17.0).cos()).collect();
    let data = Dataset::new(vec!["x".into(), "y".into()], vec![xs, ys]).expect("rectangular");
    CellBinding {
        cell: CellId::new(1, 0),
        view: Arc::new(DatasetView::full(Arc::new(data))),
        size: Size::square(100),
    }
}

fn bench_setup(c: &mut Criterion) {
    let factory = OverlayFactory::builtin();
    let mut group = c.benchmark_group("overlay/setup");

    for rows in [1_000usize, 10_000] {
        let b = binding(rows);
        group.bench_with_input(BenchmarkId::new("diagonal", rows), &b, |bench, b| {
            bench.iter(|| {
                let mut o = factory.instantiate("diagonal", b.clone());
                o.setup().expect("setup");
                black_box(o.geometry().len())
            })
        });
        for window in [20usize, 100] {
            let key = format!("lowess:window={window}");
            group.bench_with_input(
                BenchmarkId::new(format!("lowess_w{window}"), rows),
                &b,
                |bench, b| {
                    bench.iter(|| {
                        let mut o = factory.instantiate(&key, b.clone());
                        o.setup().expect("setup");
                        black_box(o.geometry().len())
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_setup);
criterion_main!(benches);
