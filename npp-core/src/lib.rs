//! NPP Core: price series, recession windows, data provider, cache, peak aligner.
//!
//! This crate holds everything below the run orchestration:
//! - Domain types (price points, the raw series, recession windows)
//! - The `DataProvider` trait and the Stooq CSV provider
//! - Row canonicalization shared by the provider and the cache reader
//! - The flat-file CSV cache keyed by end date
//! - Peak alignment onto a shared days-from-peak axis

pub mod data;
pub mod domain;

/// Default provider symbol: Dow Jones Industrial Average on Stooq.
pub const DEFAULT_SYMBOL: &str = "^DJI";
