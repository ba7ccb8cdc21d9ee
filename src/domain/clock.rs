//! Wall-clock access, injectable so marks can be dated deterministically.

use chrono::{DateTime, Local, NaiveDate, Utc};

pub trait Clock {
    /// Calendar date used for daily and benchmark marks.
    fn today(&self) -> NaiveDate;

    /// Timestamp used for account creation, fills and journal entries.
    fn now(&self) -> DateTime<Utc>;
}

/// The machine's clock; marks use the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub date: NaiveDate,
    pub instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        let instant = date
            .and_hms_opt(16, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_default();
        FixedClock { date, instant }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}
