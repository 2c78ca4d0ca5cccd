//! Series loading and end-date resolution for the runner.
//!
//! Implements the source policy:
//! 1. `Remote` → one provider call from `history_start` through the requested
//!    end date, then the raw cache is (re)written under the effective end date
//! 2. `Cache` → read the raw cache file for the requested end date; a missing
//!    file is fatal, there is no fallback to the network
//!
//! The effective end date is the date of the last row received. The provider
//! may not have a close for the requested day yet (weekend, holiday, before
//! the close is published), so every artifact of the run is keyed by it.

use chrono::NaiveDate;
use npp_core::data::{DataError, DataProvider, DataSource, SeriesCache};
use npp_core::domain::RawSeries;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SeriesSource;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("remote source selected but no provider is available for '{symbol}'")]
    NoProvider { symbol: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how the series is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub symbol: String,
    /// First date requested from the provider.
    pub history_start: NaiveDate,
    /// Requested cutoff date.
    pub end: NaiveDate,
    pub source: SeriesSource,
}

/// Result of loading the series, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: RawSeries,
    /// Date every artifact of the run is keyed by.
    pub effective_end: NaiveDate,
    pub requested_end: NaiveDate,
    pub source: DataSource,
    /// Malformed or out-of-range rows dropped while normalizing.
    pub dropped_rows: usize,
    /// Raw cache file read or written.
    pub raw_path: PathBuf,
    /// BLAKE3 over the series content.
    pub dataset_hash: String,
}

/// Load the raw series per `opts.source`.
pub fn load_series(
    cache: &SeriesCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let loaded = match opts.source {
        SeriesSource::Remote => {
            let provider = provider.ok_or_else(|| LoadError::NoProvider {
                symbol: opts.symbol.clone(),
            })?;
            load_remote(cache, provider, opts)?
        }
        SeriesSource::Cache => load_cached(cache, opts)?,
    };

    if loaded.dropped_rows > 0 {
        debug!(
            dropped = loaded.dropped_rows,
            "dropped malformed or out-of-range rows"
        );
    }
    info!(
        rows = loaded.series.len(),
        source = loaded.source.as_str(),
        end = %loaded.effective_end,
        "loaded {} series",
        opts.symbol
    );
    Ok(loaded)
}

fn load_remote(
    cache: &SeriesCache,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    info!(
        provider = provider.name(),
        "downloading {} from {} to {}",
        opts.symbol,
        opts.history_start,
        opts.end
    );
    let fetched = provider.fetch(&opts.symbol, opts.history_start, opts.end)?;

    let last = fetched.series.last().ok_or_else(|| DataError::NoRows {
        symbol: opts.symbol.clone(),
        start: opts.history_start,
        end: opts.end,
    })?;
    let effective_end = last.date;
    if effective_end != opts.end {
        warn!(
            "no close for {} yet; using last available date {} as the end date",
            opts.end, effective_end
        );
    }

    let raw_path = cache.write_raw(effective_end, &opts.symbol, &fetched.series, fetched.source)?;
    debug!(path = %raw_path.display(), "wrote raw cache");

    Ok(LoadedSeries {
        dataset_hash: fetched.series.content_hash(),
        series: fetched.series,
        effective_end,
        requested_end: opts.end,
        source: fetched.source,
        dropped_rows: fetched.dropped_rows,
        raw_path,
    })
}

fn load_cached(cache: &SeriesCache, opts: &LoadOptions) -> Result<LoadedSeries, LoadError> {
    let raw_path = cache.raw_path(opts.end);
    info!(path = %raw_path.display(), "reading cached series");
    let canonical = cache.read_raw(opts.end)?;

    Ok(LoadedSeries {
        dataset_hash: canonical.series.content_hash(),
        series: canonical.series,
        effective_end: opts.end,
        requested_end: opts.end,
        source: DataSource::Cache,
        dropped_rows: canonical.dropped,
        raw_path,
    })
}
