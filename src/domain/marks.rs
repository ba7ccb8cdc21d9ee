//! Daily portfolio marks and benchmark marks.
//!
//! The store never enforces one mark per day; readers collapse same-day
//! rows with [`latest_per_day`].

use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyMark {
    pub id: i64,
    pub account_id: i64,
    pub marked_on: NaiveDate,
    pub equity: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkMark {
    pub id: i64,
    pub symbol: String,
    pub marked_on: NaiveDate,
    pub value: f64,
}

/// Anything stored as one row per (series, date) with an insertion id.
pub trait Dated {
    fn date(&self) -> NaiveDate;
    fn row_id(&self) -> i64;
}

impl Dated for DailyMark {
    fn date(&self) -> NaiveDate {
        self.marked_on
    }
    fn row_id(&self) -> i64 {
        self.id
    }
}

impl Dated for BenchmarkMark {
    fn date(&self) -> NaiveDate {
        self.marked_on
    }
    fn row_id(&self) -> i64 {
        self.id
    }
}

/// Keep the most recently inserted row for each date, ordered by date.
pub fn latest_per_day<T: Dated + Clone>(marks: &[T]) -> Vec<T> {
    let mut by_date: BTreeMap<NaiveDate, &T> = BTreeMap::new();
    for mark in marks {
        by_date
            .entry(mark.date())
            .and_modify(|kept| {
                if mark.row_id() >= kept.row_id() {
                    *kept = mark;
                }
            })
            .or_insert(mark);
    }
    by_date.into_values().cloned().collect()
}
