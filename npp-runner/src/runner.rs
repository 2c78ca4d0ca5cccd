//! Single-run orchestration: load → align → persist → chart.
//!
//! One synchronous pass. Every artifact of the run is keyed by the effective
//! end date returned by the loader.

use chrono::NaiveDate;
use npp_core::data::{align_windows, DataError, DataProvider, DataSource, MergedTable, Peak};
use npp_core::domain::earliest_start;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};
use crate::reporting::{write_chart, write_merged_parquet, ReportError};

/// Errors from a full run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("cache error: {0}")]
    Cache(#[from] DataError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Peak found for one window, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSummary {
    pub label_years: String,
    pub begin_month: String,
    pub peak: Option<Peak>,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub effective_end: NaiveDate,
    pub requested_end: NaiveDate,
    pub source: DataSource,
    pub rows: usize,
    pub dataset_hash: String,
    pub peaks: Vec<PeakSummary>,
    pub raw_path: PathBuf,
    pub merged_path: PathBuf,
    pub chart_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
}

fn ensure_dir(path: &Path) -> Result<(), RunError> {
    fs::create_dir_all(path).map_err(|source| RunError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn summarize(table: &MergedTable) -> Vec<PeakSummary> {
    table
        .columns()
        .iter()
        .map(|c| PeakSummary {
            label_years: c.window.label_years.clone(),
            begin_month: c.window.begin_month.clone(),
            peak: c.peak,
        })
        .collect()
}

/// Load the series per `config` with the end date resolved against `today`.
pub fn load(
    config: &RunConfig,
    provider: Option<&dyn DataProvider>,
    today: NaiveDate,
) -> Result<LoadedSeries, RunError> {
    config.validate()?;
    let end = config.resolve_end_date(today)?;
    if let Some(oldest) = earliest_start(&config.windows()) {
        if config.history_start > oldest {
            warn!(
                "history starts {} but the oldest window opens {oldest}; \
                 early windows will be empty",
                config.history_start
            );
        }
    }
    ensure_dir(&config.data_dir)?;

    let opts = LoadOptions {
        symbol: config.symbol.clone(),
        history_start: config.history_start,
        end,
        source: config.source,
    };
    Ok(load_series(&config.series_cache(), provider, &opts)?)
}

/// Load the series and compute each window's peak without writing the merged
/// table or the chart.
pub fn find_peaks(
    config: &RunConfig,
    provider: Option<&dyn DataProvider>,
    today: NaiveDate,
) -> Result<(LoadedSeries, Vec<PeakSummary>), RunError> {
    let loaded = load(config, provider, today)?;
    let table = align_windows(&loaded.series, &config.windows(), config.max_bounds());
    let peaks = summarize(&table);
    Ok((loaded, peaks))
}

/// Run the full pipeline.
pub fn run(
    config: &RunConfig,
    provider: Option<&dyn DataProvider>,
    today: NaiveDate,
) -> Result<RunOutput, RunError> {
    let loaded = load(config, provider, today)?;
    let end = loaded.effective_end;
    ensure_dir(&config.image_dir)?;

    let table = align_windows(&loaded.series, &config.windows(), config.max_bounds());
    let cache = config.series_cache();
    let merged_path = cache.write_merged(end, &table)?;
    info!(path = %merged_path.display(), rows = table.len(), "wrote merged table");

    let parquet_path = if config.write_parquet {
        let path = config.parquet_path(end);
        write_merged_parquet(&path, &table).map_err(ReportError::from)?;
        info!(path = %path.display(), "wrote parquet export");
        Some(path)
    } else {
        None
    };

    let chart_path = config.chart_path(end);
    write_chart(&chart_path, &table, config, end)?;
    info!(path = %chart_path.display(), "wrote chart");

    if config.html_show {
        open_in_browser(&chart_path);
    }

    Ok(RunOutput {
        effective_end: end,
        requested_end: loaded.requested_end,
        source: loaded.source,
        rows: loaded.series.len(),
        dataset_hash: loaded.dataset_hash,
        peaks: summarize(&table),
        raw_path: loaded.raw_path,
        merged_path,
        chart_path,
        parquet_path,
    })
}

/// Best-effort hand-off to the platform opener. Failure only logs.
fn open_in_browser(path: &Path) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    match std::process::Command::new(opener).arg(path).spawn() {
        Ok(_) => info!("opened {} with {opener}", path.display()),
        Err(e) => warn!("could not open {} with {opener}: {e}", path.display()),
    }
}
