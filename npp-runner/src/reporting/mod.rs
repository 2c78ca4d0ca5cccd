//! Run outputs beyond the cache files: the interactive chart and the
//! optional Parquet export.

pub mod chart;
pub mod html;
pub mod parquet;

use chrono::NaiveDate;
use npp_core::data::cache::write_atomic;
use npp_core::data::{DataError, MergedTable};
use std::path::Path;
use thiserror::Error;

pub use chart::{build_chart, ChartModel, Marker, Tick, Trace};
pub use html::render_html;
pub use parquet::write_merged_parquet;

use crate::config::RunConfig;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("chart serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write chart: {0}")]
    Write(#[from] DataError),

    #[error("parquet export: {0}")]
    Parquet(#[from] polars::prelude::PolarsError),
}

/// Build, render and write the chart page for `table` to `path`.
pub fn write_chart(
    path: &Path,
    table: &MergedTable,
    config: &RunConfig,
    end: NaiveDate,
) -> Result<ChartModel, ReportError> {
    let chart = build_chart(table, config, end);
    let page = render_html(&chart)?;
    write_atomic(path, page.as_bytes())?;
    Ok(chart)
}
