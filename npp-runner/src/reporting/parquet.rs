//! Merged table export to Parquet.
//!
//! Same layout as the merged CSV (`days_frm_peak`, then `Date{i}`, `Close{i}`,
//! `close_dv_pk{i}` per window) with typed columns and nulls for missing cells.

use chrono::{Datelike, NaiveDate};
use npp_core::data::MergedTable;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, ParquetWriter, PolarsResult, Series};
use std::fs::File;
use std::path::Path;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Build the merged table as a DataFrame.
pub fn merged_frame(table: &MergedTable) -> PolarsResult<DataFrame> {
    let offsets: Vec<i64> = table.offsets().collect();
    let mut columns: Vec<Column> = vec![Series::new("days_frm_peak".into(), offsets).into()];

    for (i, column) in table.columns().iter().enumerate() {
        let cells = column.cells();
        let dates: Vec<Option<i32>> = cells
            .iter()
            .map(|c| c.map(|p| days_since_epoch(p.date)))
            .collect();
        let closes: Vec<Option<f64>> = cells.iter().map(|c| c.map(|p| p.close)).collect();
        let normalized: Vec<Option<f64>> = cells.iter().map(|c| c.map(|p| p.normalized)).collect();

        let dates = Series::new(format!("Date{i}").into(), dates).cast(&DataType::Date)?;
        columns.push(dates.into());
        columns.push(Series::new(format!("Close{i}").into(), closes).into());
        columns.push(Series::new(format!("close_dv_pk{i}").into(), normalized).into());
    }

    DataFrame::new(columns)
}

/// Write the merged table to `path`.
pub fn write_merged_parquet(path: &Path, table: &MergedTable) -> PolarsResult<()> {
    let mut df = merged_frame(table)?;
    let mut file = File::create(path)?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
