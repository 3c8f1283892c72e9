//! Lot change and pro-rata allocation benchmarks.
//!
//! Run with: cargo bench -p lotledger-core

#![allow(missing_docs)]

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lotledger_core::{allocate_pro_rata, LotChange, LotId, LotState};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Generate N lots with varying quantities.
fn generate_lots(num_lots: usize) -> Vec<LotState> {
    (0..num_lots)
        .map(|i| {
            LotState::with_balance(
                LotId(i as u64),
                date(2024, 1, 1 + (i % 28) as u32),
                10_000 + (i as i64 * 137) % 5_000,
                150_000 + i as i64,
            )
        })
        .collect()
}

fn bench_allocate_pro_rata(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_pro_rata");

    for size in [10, 100, 1000] {
        let weights: Vec<i64> = generate_lots(size).iter().map(LotState::quantity).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &weights, |b, weights| {
            b.iter(|| black_box(allocate_pro_rata(1_000_003, weights)));
        });
    }

    group.finish();
}

fn bench_apply_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_reverse");

    for depth in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || LotState::with_balance(LotId(1), date(2024, 1, 1), 1_000_000, 5_000_000),
                |mut lot| {
                    let change = LotChange::new(LotId(1), -1);
                    for _ in 0..depth {
                        let _ = lot.apply(&change, false);
                    }
                    for _ in 0..depth {
                        let _ = lot.reverse(&change, false);
                    }
                    black_box(lot)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_allocate_pro_rata, bench_apply_reverse);
criterion_main!(benches);
