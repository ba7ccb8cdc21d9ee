#![allow(dead_code)]

use chrono::NaiveDate;
use papertrade::adapters::sqlite_adapter::SqliteAdapter;
use papertrade::domain::clock::FixedClock;
use papertrade::domain::error::PaperTradeError;
pub use papertrade::domain::price::{HistoryWindow, PriceBar};
use papertrade::ports::quote_port::QuotePort;
use std::cell::RefCell;
use std::collections::HashMap;

/// Quote source backed by in-memory maps. Prices can be changed between
/// calls to simulate the market moving.
pub struct MockQuotePort {
    pub prices: RefCell<HashMap<String, f64>>,
    pub histories: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            prices: RefCell::new(HashMap::new()),
            histories: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_price(self, symbol: &str, price: f64) -> Self {
        self.prices.borrow_mut().insert(symbol.to_string(), price);
        self
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.histories
            .insert(symbol.to_string(), bars_from_closes(closes));
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.borrow_mut().insert(symbol.to_string(), price);
    }

    fn check_error(&self, symbol: &str) -> Result<(), PaperTradeError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(PaperTradeError::QuoteProvider {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl QuotePort for MockQuotePort {
    fn last_price(&self, symbol: &str) -> Result<f64, PaperTradeError> {
        self.check_error(symbol)?;
        self.prices
            .borrow()
            .get(symbol)
            .copied()
            .ok_or_else(|| PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            })
    }

    fn history(
        &self,
        symbol: &str,
        _window: HistoryWindow,
    ) -> Result<Vec<PriceBar>, PaperTradeError> {
        self.check_error(symbol)?;
        match self.histories.get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            }),
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn clock(s: &str) -> FixedClock {
    FixedClock::on(date(s))
}

/// One bar per calendar day starting 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        })
        .collect()
}

pub fn rising_closes(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

pub fn ledger() -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().unwrap();
    adapter.initialize_schema().unwrap();
    adapter
}

/// Write `<dir>/<symbol>.csv` with one bar per calendar day from 2024-01-01.
pub fn write_quote_csv(dir: &std::path::Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
    for bar in bars_from_closes(closes) {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
