//! Property tests for aligner invariants.
//!
//! Uses proptest to verify:
//! 1. Peak containment: the peak date lies inside the window whenever the window has data
//! 2. Unit peak: the normalized value at the peak date is exactly 1.0
//! 3. Monotone offsets: days from peak strictly increase with date
//! 4. Axis length: the merged table has bkwd + frwd + 1 rows regardless of data
//! 5. Latest-tie: no later in-window row reaches the peak value

use chrono::{Duration, NaiveDate};
use npp_core::data::{align_window, align_windows, find_peak, AxisBounds};
use npp_core::domain::{PricePoint, RawSeries, Window};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()
}

/// A series of up to 300 rows with random gaps and prices on a coarse grid
/// (so exact ties actually happen).
fn arb_series() -> impl Strategy<Value = RawSeries> {
    prop::collection::vec((1u32..5, 1u32..40), 0..300).prop_map(|steps| {
        let mut date = base_date();
        let points = steps
            .into_iter()
            .map(|(gap, price)| {
                date += Duration::days(i64::from(gap));
                PricePoint::new(date, f64::from(price) * 2.5)
            })
            .collect();
        RawSeries::from_points(points)
    })
}

fn arb_window() -> impl Strategy<Value = Window> {
    (0i64..800, 0i64..200).prop_map(|(start, len)| {
        let start = base_date() + Duration::days(start);
        Window::new(start, start + Duration::days(len), "x", "x", "x")
    })
}

proptest! {
    #[test]
    fn peak_lies_within_window(series in arb_series(), window in arb_window()) {
        let in_window = series.between(window.start, window.end);
        match find_peak(&series, &window) {
            Some(peak) => {
                prop_assert!(!in_window.is_empty());
                prop_assert!(window.contains(peak.date));
                prop_assert!(in_window.iter().all(|p| p.close <= peak.value));
            }
            None => prop_assert!(in_window.is_empty()),
        }
    }

    #[test]
    fn normalized_is_one_at_peak(series in arb_series(), window in arb_window()) {
        let alignment = align_window(&series, &window);
        if let Some(peak) = alignment.peak {
            let at_peak: Vec<_> = alignment
                .points
                .iter()
                .filter(|p| p.date == peak.date)
                .collect();
            prop_assert_eq!(at_peak.len(), 1);
            prop_assert_eq!(at_peak[0].normalized, 1.0);
            prop_assert_eq!(at_peak[0].days_from_peak, 0);
        }
    }

    #[test]
    fn offsets_strictly_increase(series in arb_series(), window in arb_window()) {
        let alignment = align_window(&series, &window);
        for pair in alignment.points.windows(2) {
            prop_assert!(pair[0].days_from_peak < pair[1].days_from_peak);
            prop_assert_eq!(
                pair[1].days_from_peak - pair[0].days_from_peak,
                (pair[1].date - pair[0].date).num_days()
            );
        }
    }

    #[test]
    fn axis_has_fixed_length(
        series in arb_series(),
        windows in prop::collection::vec(arb_window(), 0..6),
        bkwd in 0u32..400,
        frwd in 0u32..400,
    ) {
        let table = align_windows(&series, &windows, AxisBounds::new(bkwd, frwd));
        prop_assert_eq!(table.len(), bkwd as usize + frwd as usize + 1);
        prop_assert_eq!(table.columns().len(), windows.len());
        for column in table.columns() {
            prop_assert_eq!(column.cells().len(), table.len());
        }
    }

    #[test]
    fn tie_break_picks_latest(series in arb_series(), window in arb_window()) {
        if let Some(peak) = find_peak(&series, &window) {
            let later_tie = series
                .between(window.start, window.end)
                .iter()
                .any(|p| p.date > peak.date && p.close == peak.value);
            prop_assert!(!later_tie);
        }
    }

    #[test]
    fn merged_cells_match_offsets(series in arb_series(), window in arb_window()) {
        let bounds = AxisBounds::new(90, 90);
        let table = align_windows(&series, std::slice::from_ref(&window), bounds);
        for (offset, cell) in table.offsets().zip(table.columns()[0].cells()) {
            if let Some(cell) = cell {
                prop_assert_eq!(cell.days_from_peak, offset);
            }
        }
    }
}
