//! Stooq data provider.
//!
//! Fetches daily bars from Stooq's CSV download endpoint and keeps the date and
//! close columns. One request per fetch; failures propagate to the caller
//! unchanged and are not retried.

use super::canonicalize::{canonicalize, find_columns};
use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://stooq.com/q/d/l/";

/// Stooq data provider.
pub struct StooqProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl StooqProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Provider against a different endpoint (mirrors, local test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| {
                DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build the CSV download URL for a symbol and date range.
    pub fn csv_url(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<reqwest::Url, DataError> {
        let d1 = start.format("%Y%m%d").to_string();
        let d2 = end.format("%Y%m%d").to_string();
        let symbol = symbol.to_lowercase();
        reqwest::Url::parse_with_params(
            &self.base_url,
            &[("s", symbol.as_str()), ("d1", &d1), ("d2", &d2), ("i", "d")],
        )
        .map_err(|e| DataError::InvalidRequest(format!("bad provider URL {}: {e}", self.base_url)))
    }

    /// Parse the CSV body into a normalized fetch result.
    ///
    /// Stooq answers `No data` (with HTTP 200) for unknown symbols and empty
    /// ranges. Row order in the body does not matter.
    pub fn parse_csv(
        symbol: &str,
        body: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let no_rows = || DataError::NoRows {
            symbol: symbol.to_string(),
            start,
            end,
        };

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no data") {
            return Err(no_rows());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(trimmed.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| DataError::ResponseFormat(format!("unreadable header for {symbol}: {e}")))?
            .clone();
        let (date_idx, close_idx) = find_columns(headers.iter()).ok_or_else(|| {
            DataError::ResponseFormat(format!(
                "expected Date and Close columns for {symbol}, got: {}",
                headers.iter().collect::<Vec<_>>().join(",")
            ))
        })?;

        let mut malformed = 0usize;
        let records: Vec<csv::StringRecord> = reader
            .records()
            .filter_map(|r| r.map_err(|_| malformed += 1).ok())
            .collect();

        let rows = records.iter().map(|r| {
            (
                r.get(date_idx).unwrap_or_default(),
                r.get(close_idx).unwrap_or_default(),
            )
        });
        let canonical = canonicalize(rows);
        let full_len = canonical.series.len();
        let series = canonical.series.clipped(start, end);

        if series.is_empty() {
            return Err(no_rows());
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            dropped_rows: malformed + canonical.dropped + (full_len - series.len()),
            series,
            source: DataSource::Stooq,
        })
    }
}

impl DataProvider for StooqProvider {
    fn name(&self) -> &str {
        "stooq"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let url = self.csv_url(symbol, start, end)?;
        debug!(%url, "requesting daily series");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body for {symbol}: {e}")))?;

        let result = Self::parse_csv(symbol, &body, start, end)?;
        debug!(
            rows = result.series.len(),
            dropped = result.dropped_rows,
            "parsed provider response"
        );
        Ok(result)
    }
}
