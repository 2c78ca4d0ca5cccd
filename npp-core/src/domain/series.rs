//! Price series: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price of the index on a single trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Chronological daily closing series for one symbol.
///
/// Invariants, enforced at construction:
/// - dates strictly ascending (no duplicates),
/// - every price finite.
///
/// Non-trading days are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct RawSeries {
    points: Vec<PricePoint>,
}

impl From<Vec<PricePoint>> for RawSeries {
    fn from(points: Vec<PricePoint>) -> Self {
        Self::from_points(points)
    }
}

impl From<RawSeries> for Vec<PricePoint> {
    fn from(series: RawSeries) -> Self {
        series.points
    }
}

impl RawSeries {
    /// Build a series from rows in any order.
    ///
    /// Rows with a non-finite price are dropped. When a date appears more than
    /// once the first row seen for it is kept.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite());
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    /// Rows with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[PricePoint] {
        if start > end {
            return &[];
        }
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        &self.points[lo..hi]
    }

    /// A copy of the series restricted to `[start, end]`.
    pub fn clipped(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self.between(start, end).to_vec(),
        }
    }

    /// Deterministic BLAKE3 hash over dates and prices.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for p in &self.points {
            hasher.update(p.date.to_string().as_bytes());
            hasher.update(&p.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<'a> IntoIterator for &'a RawSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
