//! Data ingestion, caching and peak alignment

pub mod align;
pub mod cache;
pub mod canonicalize;
pub mod provider;
pub mod stooq;

pub use align::{
    align_window, align_windows, find_peak, merge, AlignedPoint, AxisBounds, MergedColumn,
    MergedTable, Peak, WindowAlignment,
};
pub use cache::{CacheEntry, CacheMeta, SeriesCache};
pub use canonicalize::{canonicalize, Canonical};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, FixtureProvider};
pub use stooq::StooqProvider;
