//! Domain types: price series and recession windows.

pub mod series;
pub mod window;

pub use series::{PricePoint, RawSeries};
pub use window::{earliest_start, recession_windows, Window};
