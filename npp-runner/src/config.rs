//! Serializable run configuration.
//!
//! One `RunConfig` carries every parameter of a run. It loads from TOML (all
//! fields optional, defaults below) and the CLI layers its flags on top.
//!
//! ```toml
//! end_date = "2020-03-31"   # or "today"
//! source = "cache"          # or "remote"
//! frwd_mths_main = 24
//! ```

use chrono::NaiveDate;
use npp_core::data::{AxisBounds, SeriesCache};
use npp_core::domain::{recession_windows, Window};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Days per year used for the month → day conversion.
const DAYS_PER_YEAR: f64 = 364.25;

/// Upper bound for every `*_mths_*` setting (a century either side of the peak).
pub const MAX_MONTHS: u32 = 1200;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid end date '{0}' (expected 'today' or YYYY-MM-DD)")]
    EndDate(String),

    #[error("{side} main window ({main} months) is wider than the max window ({max} months)")]
    MainExceedsMax {
        side: &'static str,
        main: u32,
        max: u32,
    },

    #[error("{field} is {value} months; at most {max} are supported")]
    MonthsTooLarge {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("history start {start} is not before end date {end}")]
    HistoryAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("window '{label}' ends before it starts")]
    InvertedWindow { label: String },

    #[error("window list is empty")]
    NoWindows,

    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Where the raw series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSource {
    /// Download from the provider and refresh the raw cache.
    #[default]
    Remote,
    /// Read the raw cache file for the requested end date.
    Cache,
}

/// Requested cutoff date: a fixed day or the local calendar day of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EndDate {
    #[default]
    Today,
    On(NaiveDate),
}

impl EndDate {
    /// Resolve against the given "today".
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            EndDate::Today => today,
            EndDate::On(date) => date,
        }
    }
}

impl FromStr for EndDate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("today") {
            return Ok(EndDate::Today);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(EndDate::On)
            .map_err(|_| ConfigError::EndDate(s.to_string()))
    }
}

impl TryFrom<String> for EndDate {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EndDate> for String {
    fn from(end: EndDate) -> Self {
        end.to_string()
    }
}

impl fmt::Display for EndDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndDate::Today => f.write_str("today"),
            EndDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Convert a month count to calendar days, rounding half to even.
pub fn months_to_days(months: u32) -> u32 {
    (f64::from(months) * DAYS_PER_YEAR / 12.0).round_ties_even() as u32
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Provider symbol.
    pub symbol: String,
    /// File-name stem for every artifact.
    pub series_name: String,
    /// Display name in chart text.
    pub index_label: String,
    /// First date requested from the provider.
    pub history_start: NaiveDate,
    pub end_date: EndDate,
    pub source: SeriesSource,

    /// Default visible chart window, months after/before the peak.
    pub frwd_mths_main: u32,
    pub bkwd_mths_main: u32,
    /// Merged axis extent, months after/before the peak.
    pub frwd_mths_max: u32,
    pub bkwd_mths_max: u32,

    pub data_dir: PathBuf,
    pub image_dir: PathBuf,

    /// Open the chart in the system browser after writing it.
    pub html_show: bool,
    /// Also export the merged table as Parquet.
    pub write_parquet: bool,

    /// Replaces the built-in recession list when set.
    pub windows: Option<Vec<Window>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbol: npp_core::DEFAULT_SYMBOL.to_string(),
            series_name: "djia".to_string(),
            index_label: "DJIA".to_string(),
            history_start: NaiveDate::from_ymd_opt(1896, 5, 27).expect("valid history start"),
            end_date: EndDate::Today,
            source: SeriesSource::Remote,
            frwd_mths_main: 36,
            bkwd_mths_main: 4,
            frwd_mths_max: 60,
            bkwd_mths_max: 8,
            data_dir: PathBuf::from("data"),
            image_dir: PathBuf::from("images"),
            html_show: false,
            write_parquet: false,
            windows: None,
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks that don't depend on the run date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptyField("symbol"));
        }
        if self.series_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("series_name"));
        }
        for (field, value) in [
            ("bkwd_mths_main", self.bkwd_mths_main),
            ("frwd_mths_main", self.frwd_mths_main),
            ("bkwd_mths_max", self.bkwd_mths_max),
            ("frwd_mths_max", self.frwd_mths_max),
        ] {
            if value > MAX_MONTHS {
                return Err(ConfigError::MonthsTooLarge {
                    field,
                    value,
                    max: MAX_MONTHS,
                });
            }
        }
        if self.frwd_mths_main > self.frwd_mths_max {
            return Err(ConfigError::MainExceedsMax {
                side: "forward",
                main: self.frwd_mths_main,
                max: self.frwd_mths_max,
            });
        }
        if self.bkwd_mths_main > self.bkwd_mths_max {
            return Err(ConfigError::MainExceedsMax {
                side: "backward",
                main: self.bkwd_mths_main,
                max: self.bkwd_mths_max,
            });
        }
        if let Some(windows) = &self.windows {
            if windows.is_empty() {
                return Err(ConfigError::NoWindows);
            }
            if let Some(bad) = windows.iter().find(|w| w.start > w.end) {
                return Err(ConfigError::InvertedWindow {
                    label: bad.label_years.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve the requested end date and check it against `history_start`.
    pub fn resolve_end_date(&self, today: NaiveDate) -> Result<NaiveDate, ConfigError> {
        let end = self.end_date.resolve(today);
        if self.history_start >= end {
            return Err(ConfigError::HistoryAfterEnd {
                start: self.history_start,
                end,
            });
        }
        Ok(end)
    }

    /// The merged axis: `[-bkwd_days_max, +frwd_days_max]`.
    pub fn max_bounds(&self) -> AxisBounds {
        AxisBounds::new(
            months_to_days(self.bkwd_mths_max),
            months_to_days(self.frwd_mths_max),
        )
    }

    /// The initially visible chart window.
    pub fn main_bounds(&self) -> AxisBounds {
        AxisBounds::new(
            months_to_days(self.bkwd_mths_main),
            months_to_days(self.frwd_mths_main),
        )
    }

    /// Configured windows, or the 15 built-in recessions.
    pub fn windows(&self) -> Vec<Window> {
        self.windows.clone().unwrap_or_else(recession_windows)
    }

    pub fn series_cache(&self) -> SeriesCache {
        SeriesCache::new(&self.data_dir, &self.series_name)
    }

    /// `{image_dir}/{stem}_npp_{YYYY-MM-DD}.html`
    pub fn chart_path(&self, end: NaiveDate) -> PathBuf {
        self.image_dir
            .join(format!("{}_npp_{}.html", self.series_name, end.format("%Y-%m-%d")))
    }

    /// `{data_dir}/{stem}_close_pk_{YYYY-MM-DD}.parquet`
    pub fn parquet_path(&self, end: NaiveDate) -> PathBuf {
        self.series_cache().merged_path(end).with_extension("parquet")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn months_to_days_rounds_half_even() {
        assert_eq!(months_to_days(36), 1093);
        assert_eq!(months_to_days(4), 121);
        assert_eq!(months_to_days(60), 1821);
        assert_eq!(months_to_days(8), 243);
        assert_eq!(months_to_days(0), 0);
        // 24 months = 728.5 days: ties go to the even neighbour
        assert_eq!(months_to_days(24), 728);
    }

    #[test]
    fn defaults_give_expected_axes() {
        let config = RunConfig::default();
        assert_eq!(config.max_bounds(), AxisBounds::new(243, 1821));
        assert_eq!(config.main_bounds(), AxisBounds::new(121, 1093));
        assert_eq!(config.windows().len(), 15);
        assert_eq!(config.history_start, d(1896, 5, 27));
        config.validate().unwrap();
    }

    #[test]
    fn empty_toml_is_the_default_config() {
        assert_eq!(RunConfig::from_toml("").unwrap(), RunConfig::default());
    }

    #[test]
    fn toml_overrides_fields() {
        let config = RunConfig::from_toml(
            r#"
            end_date = "2020-03-31"
            source = "cache"
            frwd_mths_main = 24
            data_dir = "/tmp/npp"
            "#,
        )
        .unwrap();

        assert_eq!(config.end_date, EndDate::On(d(2020, 3, 31)));
        assert_eq!(config.source, SeriesSource::Cache);
        assert_eq!(config.frwd_mths_main, 24);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/npp"));
        assert_eq!(config.symbol, "^DJI");
    }

    #[test]
    fn toml_windows_replace_builtin_list() {
        let config = RunConfig::from_toml(
            r#"
            [[windows]]
            start = "2020-02-01"
            end = "2020-03-15"
            label_years = "2020"
            label_months = "Feb 2020 - Apr 2020"
            begin_month = "Feb 2020"
            "#,
        )
        .unwrap();

        let windows = config.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, d(2020, 2, 1));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            RunConfig::from_toml("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn negative_months_are_rejected() {
        assert!(matches!(
            RunConfig::from_toml("bkwd_mths_max = -1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn oversized_months_are_rejected() {
        let err = RunConfig::from_toml("frwd_mths_max = 4294967295").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MonthsTooLarge {
                field: "frwd_mths_max",
                value: u32::MAX,
                max: MAX_MONTHS
            }
        ));
        assert!(RunConfig::from_toml("bkwd_mths_max = 1200\nfrwd_mths_max = 1200").is_ok());
    }

    #[test]
    fn bad_end_date_is_rejected() {
        assert!(RunConfig::from_toml("end_date = \"31/03/2020\"").is_err());
        assert!(matches!(
            "yesterday".parse::<EndDate>(),
            Err(ConfigError::EndDate(_))
        ));
    }

    #[test]
    fn main_wider_than_max_is_rejected() {
        let err = RunConfig::from_toml("frwd_mths_main = 61").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MainExceedsMax { side: "forward", main: 61, max: 60 }
        ));
    }

    #[test]
    fn inverted_and_empty_window_lists_are_rejected() {
        let config = RunConfig {
            windows: Some(vec![Window::new(d(2020, 3, 1), d(2020, 2, 1), "x", "x", "x")]),
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvertedWindow { .. })));

        let config = RunConfig {
            windows: Some(Vec::new()),
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoWindows)));
    }

    #[test]
    fn end_date_resolution() {
        let today = d(2024, 6, 3);
        let config = RunConfig::default();
        assert_eq!(config.resolve_end_date(today).unwrap(), today);

        let config = RunConfig {
            end_date: EndDate::On(d(1890, 1, 1)),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.resolve_end_date(today),
            Err(ConfigError::HistoryAfterEnd { .. })
        ));
    }

    #[test]
    fn end_date_display_round_trips() {
        for s in ["today", "2020-03-31"] {
            let end: EndDate = s.parse().unwrap();
            assert_eq!(end.to_string(), s);
        }
    }

    #[test]
    fn artifact_paths() {
        let config = RunConfig::default();
        let end = d(2020, 3, 31);
        assert_eq!(
            config.chart_path(end),
            PathBuf::from("images/djia_npp_2020-03-31.html")
        );
        assert_eq!(
            config.parquet_path(end),
            PathBuf::from("data/djia_close_pk_2020-03-31.parquet")
        );
    }

    #[test]
    fn toml_round_trip() {
        let config = RunConfig {
            end_date: EndDate::On(d(2020, 3, 31)),
            write_parquet: true,
            ..RunConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);
    }
}
