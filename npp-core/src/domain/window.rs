//! Recession windows: the date ranges searched for each pre-recession peak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A historical period whose peak anchors one aligned series.
///
/// `start..=end` is the search range for the peak. It usually opens a couple of
/// months before the official recession start month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Short year range, e.g. `1929-1933`.
    pub label_years: String,
    /// Month range, e.g. `Aug 1929 - Mar 1933`. Used as the legend entry.
    pub label_months: String,
    /// Official start month, e.g. `Aug 1929`.
    pub begin_month: String,
}

impl Window {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        label_years: impl Into<String>,
        label_months: impl Into<String>,
        begin_month: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            label_years: label_years.into(),
            label_months: label_months.into(),
            begin_month: begin_month.into(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

type Ymd = (i32, u32, u32);

// (search start, search end, years, months, begin month), oldest first.
const RECESSIONS: [(Ymd, Ymd, &str, &str, &str); 15] = [
    ((1929, 7, 1), (1929, 10, 30), "1929-1933", "Aug 1929 - Mar 1933", "Aug 1929"),
    ((1937, 3, 1), (1937, 7, 1), "1937-1938", "May 1937 - Jun 1938", "May 1937"),
    ((1945, 1, 1), (1945, 4, 1), "1945", "Feb 1945 - Oct 1945", "Feb 1945"),
    ((1948, 9, 1), (1949, 1, 31), "1948-1949", "Nov 1948 - Oct 1949", "Nov 1948"),
    ((1953, 5, 1), (1953, 9, 30), "1953-1954", "Jul 1953 - May 1954", "Jul 1953"),
    ((1957, 6, 1), (1957, 10, 31), "1957-1958", "Aug 1957 - Apr 1958", "Aug 1957"),
    ((1959, 12, 1), (1960, 7, 1), "1960-1961", "Apr 1960 - Feb 1961", "Apr 1960"),
    ((1969, 10, 1), (1970, 1, 31), "1969-1970", "Dec 1969 - Nov 1970", "Dec 1969"),
    ((1973, 9, 1), (1973, 12, 31), "1973-1975", "Nov 1973 - Mar 1975", "Nov 1973"),
    ((1979, 12, 1), (1980, 3, 1), "1980", "Jan 1980 - Jul 1980", "Jan 1980"),
    ((1981, 6, 1), (1981, 8, 30), "1981-1982", "Jul 1981 - Nov 1982", "Jul 1981"),
    ((1990, 6, 1), (1991, 8, 31), "1990-1991", "Jul 1990 - Mar 1991", "Jul 1990"),
    ((2001, 1, 25), (2001, 4, 30), "2001", "Mar 2001 - Nov 2001", "Mar 2001"),
    ((2007, 10, 1), (2008, 1, 31), "2007-2009", "Dec 2007 - Jun 2009", "Dec 2007"),
    ((2020, 2, 1), (2020, 3, 15), "2020-2020", "Feb 2020 - Apr 2020", "Feb 2020"),
];

fn ymd((y, m, d): Ymd) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("recession table holds valid calendar dates")
}

/// The 15 US recessions from the Great Depression to the 2020 pandemic, oldest first.
pub fn recession_windows() -> Vec<Window> {
    RECESSIONS
        .iter()
        .map(|&(start, end, years, months, begin)| {
            Window::new(ymd(start), ymd(end), years, months, begin)
        })
        .collect()
}

/// Earliest search start across `windows`.
pub fn earliest_start(windows: &[Window]) -> Option<NaiveDate> {
    windows.iter().map(|w| w.start).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_windows_oldest_first() {
        let windows = recession_windows();
        assert_eq!(windows.len(), 15);
        for pair in windows.windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
        assert_eq!(windows[0].label_months, "Aug 1929 - Mar 1933");
        assert_eq!(windows[14].begin_month, "Feb 2020");
    }

    #[test]
    fn every_window_is_well_formed() {
        for w in recession_windows() {
            assert!(w.start <= w.end, "{} has start after end", w.label_years);
            assert!(w.label_months.starts_with(&w.begin_month));
        }
    }

    #[test]
    fn great_recession_search_range() {
        let w = &recession_windows()[13];
        assert_eq!(w.start, NaiveDate::from_ymd_opt(2007, 10, 1).unwrap());
        assert_eq!(w.end, NaiveDate::from_ymd_opt(2008, 1, 31).unwrap());
        assert!(w.contains(NaiveDate::from_ymd_opt(2007, 10, 9).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2008, 2, 1).unwrap()));
    }

    #[test]
    fn earliest_start_is_1929() {
        assert_eq!(
            earliest_start(&recession_windows()),
            NaiveDate::from_ymd_opt(1929, 7, 1)
        );
        assert_eq!(earliest_start(&[]), None);
    }
}
