//! Renderer-independent chart model.
//!
//! Turns a merged table into traces, axis ranges, ticks, markers and text.
//! The HTML writer only serializes what is decided here.

use chrono::NaiveDate;
use npp_core::data::MergedTable;
use serde::Serialize;

use crate::config::{months_to_days, RunConfig};

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 450;

/// Fraction of the visible data span added on each side of the initial view.
const RANGE_PADDING: f64 = 0.07;
/// Initial y range when no window has data in the main view.
const FALLBACK_Y_RANGE: [f64; 2] = [0.5, 1.5];
/// Months between x-axis ticks.
const TICK_MONTHS: i32 = 4;

const FIRST_COLOR: &str = "blue";
const LAST_COLOR: &str = "black";
const EMPHASIS_WIDTH: f64 = 5.0;
const LINE_WIDTH: f64 = 2.0;
const LINE_OPACITY: f64 = 0.7;

/// Category20, first 13 entries.
pub const PALETTE: [&str; 13] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2",
];

/// One line: a window's present cells in axis order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Legend entry (long month label).
    pub name: String,
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    pub days_from_peak: Vec<i64>,
    pub normalized: Vec<f64>,
    pub dates: Vec<String>,
    pub closes: Vec<f64>,
}

/// Labelled x-axis tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub offset: i64,
    pub label: String,
}

/// Straight dashed reference line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub traces: Vec<Trace>,
    pub ticks: Vec<Tick>,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    /// Vertical line at the peak.
    pub peak_marker: Marker,
    /// Horizontal line at 1.0 across the whole axis.
    pub unity_marker: Marker,
}

/// Line color and width for window `i` of `n`.
pub fn trace_style(i: usize, n: usize) -> (&'static str, f64) {
    if i == 0 {
        (FIRST_COLOR, EMPHASIS_WIDTH)
    } else if i + 1 == n {
        (LAST_COLOR, EMPHASIS_WIDTH)
    } else {
        (PALETTE[(i - 1) % PALETTE.len()], LINE_WIDTH)
    }
}

/// Ticks every 4 months in `[-bkwd_mths, frwd_mths]`: `-4mth`, `peak`, `+4mth`...
pub fn month_ticks(bkwd_mths: u32, frwd_mths: u32) -> Vec<Tick> {
    let lo = -(bkwd_mths as i32);
    let hi = frwd_mths as i32;
    (lo..=hi)
        .filter(|m| m.rem_euclid(TICK_MONTHS) == 0)
        .map(|m| {
            let days = i64::from(months_to_days(m.unsigned_abs()));
            let (offset, label) = match m {
                0 => (0, "peak".to_string()),
                m if m < 0 => (-days, format!("{m}mth")),
                m => (days, format!("+{m}mth")),
            };
            Tick { offset, label }
        })
        .collect()
}

/// Initial x range: the main window padded by 7% of its span.
pub fn x_range(config: &RunConfig) -> [f64; 2] {
    let months = config.frwd_mths_main.saturating_add(config.bkwd_mths_main);
    let span = f64::from(months_to_days(months));
    let main = config.main_bounds();
    let pad = RANGE_PADDING * span;
    [
        -f64::from(main.bkwd_days) - pad,
        f64::from(main.frwd_days) + pad,
    ]
}

/// Initial y range: min/max normalized value over the main window across all
/// windows, padded by 7% of the spread.
pub fn y_range(table: &MergedTable, config: &RunConfig) -> [f64; 2] {
    let main = config.main_bounds();
    let (lo, hi) = (main.min_offset(), main.max_offset());

    let visible = table
        .columns()
        .iter()
        .flat_map(|c| c.present())
        .filter(|p| p.days_from_peak >= lo && p.days_from_peak <= hi)
        .map(|p| p.normalized);

    let (min, max) = visible.fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), v| {
        (mn.min(v), mx.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return FALLBACK_Y_RANGE;
    }
    let spread = max - min;
    if spread == 0.0 {
        return [min - 0.5, max + 0.5];
    }
    [min - RANGE_PADDING * spread, max + RANGE_PADDING * spread]
}

/// Build the chart for a merged table whose data ends on `end`.
pub fn build_chart(table: &MergedTable, config: &RunConfig, end: NaiveDate) -> ChartModel {
    let n = table.columns().len();
    let traces = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let (color, width) = trace_style(i, n);
            let present: Vec<_> = column.present().collect();
            Trace {
                name: column.window.label_months.clone(),
                color: color.to_string(),
                width,
                opacity: LINE_OPACITY,
                days_from_peak: present.iter().map(|p| p.days_from_peak).collect(),
                normalized: present.iter().map(|p| p.normalized).collect(),
                dates: present
                    .iter()
                    .map(|p| p.date.format("%Y-%m-%d").to_string())
                    .collect(),
                closes: present.iter().map(|p| p.close).collect(),
            }
        })
        .collect();

    let max = table.bounds();
    ChartModel {
        title: format!(
            "Progression of {} in last {n} recessions",
            config.index_label
        ),
        x_label: "Months from Peak".to_string(),
        y_label: format!("{} as fraction of Peak", config.index_label),
        caption: format!(
            "Source: historical {} data from Stooq.com, updated {}.",
            config.index_label,
            end.format("%B %-d, %Y")
        ),
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        traces,
        ticks: month_ticks(config.bkwd_mths_max, config.frwd_mths_max),
        x_range: x_range(config),
        y_range: y_range(table, config),
        peak_marker: Marker {
            x: [0.0, 0.0],
            y: [-0.5, 2.0],
        },
        unity_marker: Marker {
            x: [max.min_offset() as f64, max.max_offset() as f64],
            y: [1.0, 1.0],
        },
    }
}
