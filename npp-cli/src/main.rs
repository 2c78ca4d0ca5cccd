//! NPP CLI: normalized peak plot of an index across recessions.
//!
//! Commands:
//! - `run`: load the series, align every recession on its peak, write the
//!   merged table and the interactive chart
//! - `download`: fetch the series from Stooq and refresh the raw cache
//! - `peaks`: print each recession window's peak value and date
//! - `cache status`: list cached raw series from their metadata sidecars

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use npp_core::data::{DataProvider, StooqProvider};
use npp_runner::{EndDate, PeakSummary, RunConfig, SeriesSource};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "npp",
    version,
    about = "Normalized peak plot of an index across US recessions"
)]
struct Cli {
    /// Log at DEBUG instead of INFO.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a run configuration.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// End date: `today` or YYYY-MM-DD.
    #[arg(long)]
    end_date: Option<EndDate>,

    /// Directory for the raw and merged CSV files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: load → align → merged table → chart.
    Run {
        #[command(flatten)]
        common: ConfigArgs,

        /// Read the cached series instead of downloading.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Directory for the HTML chart.
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Also export the merged table as Parquet.
        #[arg(long, default_value_t = false)]
        parquet: bool,

        /// Open the chart in the system browser.
        #[arg(long, default_value_t = false)]
        show: bool,
    },
    /// Download the series and refresh the raw cache.
    Download {
        #[command(flatten)]
        common: ConfigArgs,
    },
    /// Print each window's peak value and date.
    Peaks {
        #[command(flatten)]
        common: ConfigArgs,

        /// Read the cached series instead of downloading.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached raw series: end date, date range, rows, size.
    Status {
        #[command(flatten)]
        common: ConfigArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            common,
            offline,
            image_dir,
            parquet,
            show,
        } => run_pipeline(common, offline, image_dir, parquet, show),
        Commands::Download { common } => run_download(common),
        Commands::Peaks {
            common,
            offline,
            json,
        } => run_peaks(common, offline, json),
        Commands::Cache { action } => match action {
            CacheAction::Status { common } => run_cache_status(common),
        },
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Config file (or defaults) with the shared flags layered on top.
fn build_config(args: &ConfigArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(end) = args.end_date {
        config.end_date = end;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// A Stooq provider when the config asks for the remote source.
fn provider_for(config: &RunConfig) -> Result<Option<StooqProvider>> {
    match config.source {
        SeriesSource::Remote => Ok(Some(
            StooqProvider::new().context("failed to build HTTP client")?,
        )),
        SeriesSource::Cache => Ok(None),
    }
}

fn run_pipeline(
    common: ConfigArgs,
    offline: bool,
    image_dir: Option<PathBuf>,
    parquet: bool,
    show: bool,
) -> Result<()> {
    let mut config = build_config(&common)?;
    if offline {
        config.source = SeriesSource::Cache;
    }
    if let Some(dir) = image_dir {
        config.image_dir = dir;
    }
    config.write_parquet |= parquet;
    config.html_show |= show;
    debug!(?config, "resolved run config");

    let provider = provider_for(&config)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);
    let out = npp_runner::run(&config, provider_ref, today())?;

    println!();
    println!("=== Normalized Peak Plot ===");
    println!("Series:       {} ({})", config.index_label, config.symbol);
    println!("End date:     {}", out.effective_end);
    if out.effective_end != out.requested_end {
        println!("Requested:    {}", out.requested_end);
    }
    println!("Source:       {}", out.source.as_str());
    println!("Rows:         {}", out.rows);
    println!();
    print_peaks(&out.peaks);
    println!();
    println!("Raw series:   {}", out.raw_path.display());
    println!("Merged table: {}", out.merged_path.display());
    if let Some(path) = &out.parquet_path {
        println!("Parquet:      {}", path.display());
    }
    println!("Chart:        {}", out.chart_path.display());
    Ok(())
}

fn run_download(common: ConfigArgs) -> Result<()> {
    let mut config = build_config(&common)?;
    config.source = SeriesSource::Remote;

    let provider = StooqProvider::new().context("failed to build HTTP client")?;
    let loaded = npp_runner::load(&config, Some(&provider), today())?;

    info!(hash = %loaded.dataset_hash, "download complete");
    println!(
        "{} rows from {} to {} ({} dropped)",
        loaded.series.len(),
        loaded.series.first().map(|p| p.date.to_string()).unwrap_or_default(),
        loaded.effective_end,
        loaded.dropped_rows
    );
    println!("Effective end date: {}", loaded.effective_end);
    println!("Saved to: {}", loaded.raw_path.display());
    Ok(())
}

fn run_peaks(common: ConfigArgs, offline: bool, json: bool) -> Result<()> {
    let mut config = build_config(&common)?;
    if offline {
        config.source = SeriesSource::Cache;
    }

    let provider = provider_for(&config)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);
    let (loaded, peaks) = npp_runner::find_peaks(&config, provider_ref, today())?;

    if json {
        let rows: Vec<serde_json::Value> = peaks
            .iter()
            .map(|p| {
                serde_json::json!({
                    "window": p.label_years,
                    "begin_month": p.begin_month,
                    "peak_value": p.peak.map(|pk| pk.value),
                    "peak_date": p.peak.map(|pk| pk.date.to_string()),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "end_date": loaded.effective_end.to_string(),
                "peaks": rows,
            }))?
        );
        return Ok(());
    }

    println!("Peaks in {} through {}:", config.index_label, loaded.effective_end);
    println!();
    print_peaks(&peaks);
    Ok(())
}

fn print_peaks(peaks: &[PeakSummary]) {
    println!("{:<4} {:<11} {:<10} {:>12} {:<10}", "#", "Window", "Rec. start", "Peak", "Date");
    println!("{}", "-".repeat(51));
    for (i, p) in peaks.iter().enumerate() {
        match &p.peak {
            Some(pk) => println!(
                "{:<4} {:<11} {:<10} {:>12.2} {:<10}",
                i, p.label_years, p.begin_month, pk.value, pk.date
            ),
            None => println!(
                "{:<4} {:<11} {:<10} {:>12} {:<10}",
                i, p.label_years, p.begin_month, "-", "(no data)"
            ),
        }
    }
}

fn run_cache_status(common: ConfigArgs) -> Result<()> {
    let config = build_config(&common)?;
    let cache = config.series_cache();
    let data_dir = cache.data_dir();
    if !data_dir.exists() {
        println!("Cache directory does not exist: {}", data_dir.display());
        return Ok(());
    }

    let entries = cache.list()?;
    if entries.is_empty() {
        println!("Cache is empty: {}", data_dir.display());
        return Ok(());
    }

    let total_size: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!("Cache: {}", data_dir.display());
    println!("Series: {} ({} files)", config.series_name, entries.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<12} {:<25} {:>8} {:>10}", "End date", "Date Range", "Rows", "Size");
    println!("{}", "-".repeat(58));
    for entry in &entries {
        let (range, rows) = match &entry.meta {
            Some(meta) => (
                format!("{} to {}", meta.first_date, meta.last_date),
                meta.row_count.to_string(),
            ),
            None => ("(no meta)".to_string(), "-".to_string()),
        };
        println!(
            "{:<12} {:<25} {:>8} {:>10}",
            entry.end_date.to_string(),
            range,
            rows,
            format_size(entry.size_bytes)
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "npp", "run", "--end-date", "2020-03-31", "--offline", "--parquet", "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                common,
                offline,
                parquet,
                show,
                ..
            } => {
                assert_eq!(
                    common.end_date,
                    Some(EndDate::On(NaiveDate::from_ymd_opt(2020, 3, 31).unwrap()))
                );
                assert!(offline && parquet && !show);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn bad_end_date_is_a_usage_error() {
        assert!(Cli::try_parse_from(["npp", "peaks", "--end-date", "tomorrow"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = ConfigArgs {
            config: None,
            end_date: Some(EndDate::Today),
            data_dir: Some(PathBuf::from("/tmp/npp-data")),
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/npp-data"));
        assert_eq!(config.image_dir, PathBuf::from("images"));
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
