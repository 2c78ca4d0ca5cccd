//! Criterion benchmarks for the peak aligner.
//!
//! Benchmarks:
//! 1. Peak search over the 15 recession windows
//! 2. Full align + merge on a century of daily closes

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use npp_core::data::{align_windows, find_peak, AxisBounds};
use npp_core::domain::{recession_windows, PricePoint, RawSeries};

// ── Helpers ──────────────────────────────────────────────────────────

/// Weekday closes from 1896 to 2020 following a slow sine-modulated drift.
fn make_series() -> RawSeries {
    let start = NaiveDate::from_ymd_opt(1896, 5, 27).unwrap();
    let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
    let mut points = Vec::new();
    let mut date = start;
    let mut i = 0u32;
    while date <= end {
        if chrono::Datelike::weekday(&date).number_from_monday() <= 5 {
            let close = 40.0 * (1.0 + f64::from(i) * 0.0003) + (f64::from(i) * 0.01).sin() * 5.0;
            points.push(PricePoint::new(date, close));
            i += 1;
        }
        date += Duration::days(1);
    }
    RawSeries::from_points(points)
}

fn bench_find_peak(c: &mut Criterion) {
    let series = make_series();
    let windows = recession_windows();
    c.bench_function("find_peak_15_windows", |b| {
        b.iter(|| {
            for w in &windows {
                black_box(find_peak(black_box(&series), w));
            }
        })
    });
}

fn bench_align_windows(c: &mut Criterion) {
    let series = make_series();
    let windows = recession_windows();
    let bounds = AxisBounds::new(243, 1821);
    c.bench_function("align_windows_full_history", |b| {
        b.iter(|| black_box(align_windows(black_box(&series), &windows, bounds)))
    });
}

criterion_group!(benches, bench_find_peak, bench_align_windows);
criterion_main!(benches);
