//! Row canonicalization: parse loose text rows into a clean `RawSeries`.
//!
//! Both the provider response and the cache reader go through here, so the two
//! paths agree on what a usable row is: a parseable date and a finite price.
//! Everything else is dropped and counted, never reported individually.

use crate::domain::{PricePoint, RawSeries};
use chrono::{NaiveDate, NaiveDateTime};

/// Canonicalized series plus the number of rows that did not survive.
#[derive(Debug, Clone, Default)]
pub struct Canonical {
    pub series: RawSeries,
    pub dropped: usize,
}

/// Parse a date cell. Accepts `YYYY-MM-DD` with an optional time part.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .ok()
}

/// Parse a price cell. Placeholders such as `.`, `na`, `NaN` and empty cells
/// yield `None`.
pub fn parse_price(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonicalize `(date, close)` text rows.
///
/// The result is sorted ascending with duplicates removed (first wins).
pub fn canonicalize<'a, I>(rows: I) -> Canonical
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut points = Vec::new();
    let mut seen = 0usize;
    for (date, close) in rows {
        seen += 1;
        if let (Some(date), Some(close)) = (parse_date(date), parse_price(close)) {
            points.push(PricePoint::new(date, close));
        }
    }
    let series = RawSeries::from_points(points);
    Canonical {
        dropped: seen - series.len(),
        series,
    }
}

/// Locate the `date` and `close` columns in a header row, case-insensitively.
pub fn find_columns<'a, I>(headers: I) -> Option<(usize, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut date_idx = None;
    let mut close_idx = None;
    for (i, name) in headers.into_iter().enumerate() {
        let name = name.trim().trim_start_matches('\u{feff}');
        if date_idx.is_none() && name.eq_ignore_ascii_case("date") {
            date_idx = Some(i);
        } else if close_idx.is_none() && name.eq_ignore_ascii_case("close") {
            close_idx = Some(i);
        }
    }
    date_idx.zip(close_idx)
}
