//! Flat-file CSV cache keyed by end date.
//!
//! Layout under `{data_dir}`:
//! - `{stem}_close_{YYYY-MM-DD}.csv`: raw series, `Date,Close`
//! - `{stem}_close_{YYYY-MM-DD}.meta.json`: metadata sidecar for the raw series
//! - `{stem}_close_pk_{YYYY-MM-DD}.csv`: merged table
//!
//! Writes are atomic (write to .tmp, rename into place) and deterministic:
//! identical input produces byte-identical files.

use super::align::MergedTable;
use super::canonicalize::{canonicalize, find_columns, Canonical};
use super::provider::{DataError, DataSource};
use crate::domain::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const DATE_FMT: &str = "%Y-%m-%d";

/// Metadata sidecar for a cached raw series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    /// End date the file is keyed by.
    pub end_date: NaiveDate,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    pub source: DataSource,
}

/// One raw series found in the cache directory.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub end_date: NaiveDate,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub meta: Option<CacheMeta>,
}

/// The CSV cache.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    data_dir: PathBuf,
    stem: String,
}

impl SeriesCache {
    pub fn new(data_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            stem: stem.into(),
        }
    }

    /// Root directory of the cache.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), DataError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            DataError::Cache(format!("failed to create {}: {e}", self.data_dir.display()))
        })
    }

    fn raw_prefix(&self) -> String {
        format!("{}_close_", self.stem)
    }

    pub fn raw_path(&self, end: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.csv", self.raw_prefix(), end.format(DATE_FMT)))
    }

    pub fn meta_path(&self, end: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.meta.json", self.raw_prefix(), end.format(DATE_FMT)))
    }

    pub fn merged_path(&self, end: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}_close_pk_{}.csv", self.stem, end.format(DATE_FMT)))
    }

    /// Write a raw series and its metadata sidecar, keyed by `end`.
    pub fn write_raw(
        &self,
        end: NaiveDate,
        symbol: &str,
        series: &RawSeries,
        source: DataSource,
    ) -> Result<PathBuf, DataError> {
        let (first, last) = match (series.first(), series.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => return Err(DataError::Cache("no rows to cache".into())),
        };
        self.ensure_dir()?;

        let mut buf = Vec::new();
        write_raw_csv(series, &mut buf)?;
        let path = self.raw_path(end);
        write_atomic(&path, &buf)?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            end_date: end,
            first_date: first,
            last_date: last,
            row_count: series.len(),
            data_hash: series.content_hash(),
            source,
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Cache(format!("meta serialization: {e}")))?;
        write_atomic(&self.meta_path(end), meta_json.as_bytes())?;

        Ok(path)
    }

    /// Read the raw series keyed by `end`.
    ///
    /// Fails with `MissingCacheFile` when the file is absent; there is no
    /// fallback to the provider here.
    pub fn read_raw(&self, end: NaiveDate) -> Result<Canonical, DataError> {
        let path = self.raw_path(end);
        if !path.exists() {
            return Err(DataError::MissingCacheFile { path });
        }
        let content = fs::read(&path)
            .map_err(|e| DataError::Cache(format!("read {}: {e}", path.display())))?;
        read_raw_csv(&content)
            .map_err(|e| DataError::Cache(format!("{}: {e}", path.display())))
    }

    /// Write the merged table keyed by `end`.
    pub fn write_merged(&self, end: NaiveDate, table: &MergedTable) -> Result<PathBuf, DataError> {
        self.ensure_dir()?;
        let mut buf = Vec::new();
        write_merged_csv(table, &mut buf)?;
        let path = self.merged_path(end);
        write_atomic(&path, &buf)?;
        Ok(path)
    }

    /// Metadata sidecar for the raw series keyed by `end`, if present and readable.
    pub fn get_meta(&self, end: NaiveDate) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(end)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Raw series present in the cache directory, oldest end date first.
    pub fn list(&self) -> Result<Vec<CacheEntry>, DataError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = self.raw_prefix();
        let entries = fs::read_dir(&self.data_dir)
            .map_err(|e| DataError::Cache(format!("read dir: {e}")))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Cache(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(date_part) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
            else {
                continue;
            };
            // `{stem}_close_pk_...` shares the prefix; its remainder is not a date.
            let Ok(end_date) = NaiveDate::parse_from_str(date_part, DATE_FMT) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            found.push(CacheEntry {
                end_date,
                path: entry.path(),
                size_bytes,
                meta: self.get_meta(end_date),
            });
        }
        found.sort_by_key(|e| e.end_date);
        Ok(found)
    }
}

/// Serialize a raw series as `Date,Close` CSV.
pub fn write_raw_csv<W: Write>(series: &RawSeries, out: W) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(out);
    let csv_err = |e: csv::Error| DataError::Cache(format!("csv write: {e}"));
    wtr.write_record(["Date", "Close"]).map_err(csv_err)?;
    for p in series {
        wtr.write_record([p.date.format(DATE_FMT).to_string(), p.close.to_string()])
            .map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| DataError::Cache(format!("csv flush: {e}")))
}

/// Parse `Date,Close` CSV, dropping malformed rows.
///
/// Cells that are not valid UTF-8 count as malformed; only an unreadable
/// header fails the whole read.
pub fn read_raw_csv(content: &[u8]) -> Result<Canonical, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);
    let headers = reader
        .byte_headers()
        .map_err(|e| format!("unreadable header: {e}"))?
        .clone();
    let headers = headers
        .iter()
        .map(std::str::from_utf8)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("unreadable header: {e}"))?;
    let (date_idx, close_idx) = find_columns(headers.iter().copied())
        .ok_or_else(|| "expected Date and Close columns".to_string())?;

    let mut malformed = 0usize;
    let records: Vec<csv::ByteRecord> = reader
        .byte_records()
        .filter_map(|r| r.map_err(|_| malformed += 1).ok())
        .collect();
    let cell = |r: &csv::ByteRecord, idx: usize| -> String {
        r.get(idx)
            .and_then(|b| std::str::from_utf8(b).ok())
            .unwrap_or_default()
            .to_string()
    };
    let rows: Vec<(String, String)> = records
        .iter()
        .map(|r| (cell(r, date_idx), cell(r, close_idx)))
        .collect();
    let mut canonical = canonicalize(rows.iter().map(|(d, c)| (d.as_str(), c.as_str())));
    canonical.dropped += malformed;
    Ok(canonical)
}

/// Serialize the merged table.
///
/// Header: `days_frm_peak`, then `Date{i},Close{i},close_dv_pk{i}` per window.
/// Missing cells are empty fields.
pub fn write_merged_csv<W: Write>(table: &MergedTable, out: W) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(out);
    let csv_err = |e: csv::Error| DataError::Cache(format!("csv write: {e}"));

    let mut header = vec!["days_frm_peak".to_string()];
    for i in 0..table.columns().len() {
        header.push(format!("Date{i}"));
        header.push(format!("Close{i}"));
        header.push(format!("close_dv_pk{i}"));
    }
    wtr.write_record(&header).map_err(csv_err)?;

    let mut record = Vec::with_capacity(header.len());
    for (row, offset) in table.offsets().enumerate() {
        record.clear();
        record.push(offset.to_string());
        for column in table.columns() {
            match &column.cells()[row] {
                Some(cell) => {
                    record.push(cell.date.format(DATE_FMT).to_string());
                    record.push(cell.close.to_string());
                    record.push(cell.normalized.to_string());
                }
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| DataError::Cache(format!("csv flush: {e}")))
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    fs::write(&tmp_path, bytes)
        .map_err(|e| DataError::Cache(format!("write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Cache(format!("atomic rename failed: {e}"))
    })
}
