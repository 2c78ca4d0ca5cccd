//! Property tests for the month → day conversion and chart geometry.

use npp_runner::months_to_days;
use npp_runner::reporting::chart::{month_ticks, x_range};
use npp_runner::RunConfig;
use proptest::prelude::*;

proptest! {
    #[test]
    fn conversion_is_monotone(m in 0u32..1200) {
        prop_assert!(months_to_days(m) <= months_to_days(m + 1));
        // 364.25 / 12 ≈ 30.35 days per month
        prop_assert!(months_to_days(m + 1) - months_to_days(m) <= 31);
    }

    #[test]
    fn ticks_are_ordered_and_labelled(bkwd in 0u32..48, frwd in 0u32..120) {
        let ticks = month_ticks(bkwd, frwd);
        prop_assert!(ticks.iter().any(|t| t.label == "peak" && t.offset == 0));
        for pair in ticks.windows(2) {
            prop_assert!(pair[0].offset < pair[1].offset);
        }
        for tick in &ticks {
            prop_assert!(tick.offset >= -i64::from(months_to_days(bkwd)));
            prop_assert!(tick.offset <= i64::from(months_to_days(frwd)));
            prop_assert!(tick.label == "peak" || tick.label.ends_with("mth"));
        }
    }

    #[test]
    fn x_range_contains_main_window(
        bkwd_main in 0u32..8,
        frwd_main in 0u32..60,
    ) {
        let config = RunConfig {
            bkwd_mths_main: bkwd_main,
            frwd_mths_main: frwd_main,
            ..RunConfig::default()
        };
        let main = config.main_bounds();
        let [lo, hi] = x_range(&config);
        prop_assert!(lo <= main.min_offset() as f64);
        prop_assert!(hi >= main.max_offset() as f64);
    }
}
