//! Daily price bars and history windows.

use chrono::{Days, Months, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Trailing span of daily history to request from a quote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Days(u32),
    Months(u32),
}

impl HistoryWindow {
    /// Earliest date included in the window ending at `end`.
    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        match *self {
            HistoryWindow::Days(n) => end
                .checked_sub_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MIN),
            HistoryWindow::Months(n) => end
                .checked_sub_months(Months::new(n))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryWindow::Days(n) => write!(f, "{n}d"),
            HistoryWindow::Months(n) => write!(f, "{n}mo"),
        }
    }
}

/// Closing prices in bar order, skipping non-finite values.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .map(|b| b.close)
        .filter(|c| c.is_finite())
        .collect()
}
