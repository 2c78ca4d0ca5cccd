//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over the price source (Stooq over HTTP,
//! an in-memory fixture in tests) so the loader never talks to the network
//! directly.

use crate::domain::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Network and format failures are fatal to a run; nothing here is retried.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} fetching {symbol}")]
    HttpStatus { status: u16, symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("provider returned no rows for {symbol} between {start} and {end}")]
    NoRows {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(
        "cache file not found: {} (fetch it first or switch to the remote source)",
        path.display()
    )]
    MissingCacheFile { path: PathBuf },

    #[error("cache error: {0}")]
    Cache(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Stooq,
    Cache,
    Fixture,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Stooq => "stooq",
            DataSource::Cache => "cache",
            DataSource::Fixture => "fixture",
        }
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub series: RawSeries,
    pub source: DataSource,
    /// Rows discarded while normalizing the response (malformed or out of range).
    pub dropped_rows: usize,
}

/// Trait for price providers.
///
/// Implementations return a series already normalized: ascending, deduplicated,
/// restricted to `[start, end]`. The cache layer sits above this trait;
/// providers don't know about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closing prices for a symbol over a date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;
}

/// Provider serving a fixed in-memory series. Used by tests and benches.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    series: RawSeries,
}

impl FixtureProvider {
    pub fn new(series: RawSeries) -> Self {
        Self { series }
    }
}

impl DataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let series = self.series.clipped(start, end);
        if series.is_empty() {
            return Err(DataError::NoRows {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            dropped_rows: self.series.len() - series.len(),
            series,
            source: DataSource::Fixture,
        })
    }
}
