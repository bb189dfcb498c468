use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Report period selector used by the P&L getter.
///
/// Note: the refreshed series always covers a fixed 30-day window
/// regardless of the selected period — the selector only sizes the
/// zero-filled placeholder returned before any data exists. Kept as
/// documented behavior from the original dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPeriod {
    /// Trailing week.
    Daily,
    /// Month to date (trailing 30 days).
    MonthToDate,
    /// Year to date (trailing 365 days).
    YearToDate,
}

impl ReportPeriod {
    /// Number of days the period nominally covers.
    #[must_use]
    pub fn days(&self) -> i64 {
        match self {
            ReportPeriod::Daily => 7,
            ReportPeriod::MonthToDate => 30,
            ReportPeriod::YearToDate => 365,
        }
    }
}

/// One day of the profit/loss series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlPoint {
    pub date: NaiveDate,
    pub daily_pl: f64,
    pub cumulative_pl: f64,
}

impl PlPoint {
    /// Zero-filled series of `days` points ending at `end` (inclusive).
    /// The typed-empty placeholder for the P&L getter.
    #[must_use]
    pub fn zeroed_series(end: NaiveDate, days: i64) -> Vec<PlPoint> {
        (0..days)
            .map(|i| PlPoint {
                date: end - Duration::days(days - 1 - i),
                daily_pl: 0.0,
                cumulative_pl: 0.0,
            })
            .collect()
    }
}
