//! Peak alignment.
//!
//! For each window: find the peak close inside the window, re-index the whole
//! series as days from that peak with prices as a fraction of it, then
//! left-join every window onto one shared integer axis. Offsets with no trading
//! day stay missing (no forward-fill).

use crate::domain::{PricePoint, RawSeries, Window};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Peak close inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub value: f64,
    /// Latest date attaining `value` within the window.
    pub date: NaiveDate,
}

/// One series row re-expressed relative to a peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub days_from_peak: i64,
    /// `close / peak.value`.
    pub normalized: f64,
}

/// Whole series aligned on one window's peak.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAlignment {
    pub window: Window,
    /// `None` when the series has no rows inside the window.
    pub peak: Option<Peak>,
    /// One entry per series row, ascending. Empty when `peak` is `None`.
    pub points: Vec<AlignedPoint>,
}

/// Extent of the shared axis: `-bkwd_days..=frwd_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub bkwd_days: u32,
    pub frwd_days: u32,
}

impl AxisBounds {
    pub fn new(bkwd_days: u32, frwd_days: u32) -> Self {
        Self {
            bkwd_days,
            frwd_days,
        }
    }

    /// Number of rows on the axis.
    pub fn len(&self) -> usize {
        self.bkwd_days as usize + self.frwd_days as usize + 1
    }

    /// Never empty: offset 0 is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn min_offset(&self) -> i64 {
        -i64::from(self.bkwd_days)
    }

    pub fn max_offset(&self) -> i64 {
        i64::from(self.frwd_days)
    }

    /// Row index of an offset, `None` when it falls outside the axis.
    pub fn index_of(&self, offset: i64) -> Option<usize> {
        if offset < self.min_offset() || offset > self.max_offset() {
            return None;
        }
        usize::try_from(offset - self.min_offset()).ok()
    }

    pub fn offsets(&self) -> impl Iterator<Item = i64> {
        self.min_offset()..=self.max_offset()
    }
}

/// One window's column block on the shared axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedColumn {
    pub window: Window,
    pub peak: Option<Peak>,
    cells: Vec<Option<AlignedPoint>>,
}

impl MergedColumn {
    /// One cell per axis row.
    pub fn cells(&self) -> &[Option<AlignedPoint>] {
        &self.cells
    }

    /// Cells that hold a trading day, ascending by offset.
    pub fn present(&self) -> impl Iterator<Item = &AlignedPoint> {
        self.cells.iter().flatten()
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// All windows left-joined on the shared days-from-peak axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    bounds: AxisBounds,
    columns: Vec<MergedColumn>,
}

impl MergedTable {
    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    /// Number of axis rows.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn offsets(&self) -> impl Iterator<Item = i64> {
        self.bounds.offsets()
    }

    pub fn columns(&self) -> &[MergedColumn] {
        &self.columns
    }

    /// Cell for window `window_idx` at `offset` days from its peak.
    pub fn cell(&self, window_idx: usize, offset: i64) -> Option<&AlignedPoint> {
        let row = self.bounds.index_of(offset)?;
        self.columns.get(window_idx)?.cells.get(row)?.as_ref()
    }

    pub fn peaks(&self) -> Vec<Option<Peak>> {
        self.columns.iter().map(|c| c.peak).collect()
    }
}

/// Find the peak close within `[window.start, window.end]`.
///
/// On an exact tie the most recent date wins.
pub fn find_peak(series: &RawSeries, window: &Window) -> Option<Peak> {
    series
        .between(window.start, window.end)
        .iter()
        .fold(None, |best: Option<Peak>, p| match best {
            Some(b) if p.close < b.value => Some(b),
            _ => Some(Peak {
                value: p.close,
                date: p.date,
            }),
        })
}

fn align_point(p: &PricePoint, peak: &Peak) -> AlignedPoint {
    AlignedPoint {
        date: p.date,
        close: p.close,
        days_from_peak: (p.date - peak.date).num_days(),
        normalized: p.close / peak.value,
    }
}

/// Align the whole series on the peak of one window.
///
/// A peak close that is not positive cannot normalize the series; such a
/// window is treated as having no peak.
pub fn align_window(series: &RawSeries, window: &Window) -> WindowAlignment {
    let peak = match find_peak(series, window) {
        Some(peak) if peak.value <= 0.0 => {
            warn!("peak close {} on {} is not positive", peak.value, peak.date);
            None
        }
        other => other,
    };
    let points = match &peak {
        Some(peak) => series.iter().map(|p| align_point(p, peak)).collect(),
        None => Vec::new(),
    };
    WindowAlignment {
        window: window.clone(),
        peak,
        points,
    }
}

/// Left-join aligned series onto the shared axis.
///
/// Rows outside the axis are dropped. Series dates are unique, so each offset
/// receives at most one row per window.
pub fn merge(alignments: Vec<WindowAlignment>, bounds: AxisBounds) -> MergedTable {
    let columns = alignments
        .into_iter()
        .map(|a| {
            let mut cells = vec![None; bounds.len()];
            for point in a.points {
                if let Some(row) = bounds.index_of(point.days_from_peak) {
                    cells[row] = Some(point);
                }
            }
            MergedColumn {
                window: a.window,
                peak: a.peak,
                cells,
            }
        })
        .collect();
    MergedTable { bounds, columns }
}

/// Align every window in order and merge them onto one axis.
///
/// A window without data yields an all-missing column block; the other windows
/// are unaffected.
pub fn align_windows(series: &RawSeries, windows: &[Window], bounds: AxisBounds) -> MergedTable {
    let alignments = windows
        .iter()
        .enumerate()
        .map(|(i, window)| {
            let alignment = align_window(series, window);
            match &alignment.peak {
                Some(peak) => info!(
                    "peak_val {i} is {} on date {} (Beg. rec. month: {})",
                    peak.value, peak.date, window.begin_month
                ),
                None => warn!(
                    "window {i} ({} to {}) has no usable price data; column block left empty",
                    window.start, window.end
                ),
            }
            alignment
        })
        .collect();
    merge(alignments, bounds)
}
