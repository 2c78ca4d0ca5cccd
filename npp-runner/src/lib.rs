//! NPP Runner: run configuration, series loading, pipeline, chart output.
//!
//! This crate builds on `npp-core` to provide:
//! - `RunConfig` loaded from TOML with validated defaults
//! - Series loading with the remote/cache source policy and end-date resolution
//! - The single-run pipeline (load → align → merged CSV → chart)
//! - Chart model, standalone HTML rendering and the optional Parquet export

pub mod config;
pub mod data_loader;
pub mod reporting;
pub mod runner;

pub use config::{months_to_days, ConfigError, EndDate, RunConfig, SeriesSource};
pub use data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};
pub use reporting::{build_chart, render_html, write_chart, ChartModel, ReportError};
pub use runner::{find_peaks, load, run, PeakSummary, RunError, RunOutput};
