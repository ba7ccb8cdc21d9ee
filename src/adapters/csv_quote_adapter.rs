//! CSV file quote adapter.
//!
//! Reads `<dir>/<SYMBOL>.csv` with columns Date,Open,High,Low,Close,Volume.
//! History windows are measured back from the latest bar in the file, so a
//! fixed data set answers the same way on any calendar day.

use crate::domain::error::PaperTradeError;
use crate::domain::price::{HistoryWindow, PriceBar};
use crate::ports::quote_port::QuotePort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvQuoteAdapter {
    base_path: PathBuf,
}

impl CsvQuoteAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }

    /// Every bar in the symbol's file, oldest first.
    pub fn load_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, PaperTradeError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no quote file");
                return Err(PaperTradeError::NoPriceData {
                    symbol: symbol.to_string(),
                });
            }
        };

        let parse_error = |reason: String| PaperTradeError::QuoteProvider {
            symbol: symbol.to_string(),
            reason: format!("{}: {}", path.display(), reason),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| parse_error(format!("CSV parse error: {e}")))?;

            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| parse_error(format!("missing {name} column")))
            };
            let number = |idx: usize, name: &str| -> Result<f64, PaperTradeError> {
                field(idx, name)?
                    .parse()
                    .map_err(|e| parse_error(format!("invalid {name} value: {e}")))
            };

            let date = NaiveDate::parse_from_str(field(0, "date")?, "%Y-%m-%d")
                .map_err(|e| parse_error(format!("invalid date format: {e}")))?;
            let volume = number(5, "volume")? as i64;

            bars.push(PriceBar {
                date,
                open: number(1, "open")?,
                high: number(2, "high")?,
                low: number(3, "low")?,
                close: number(4, "close")?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn last_price(&self, symbol: &str) -> Result<f64, PaperTradeError> {
        self.load_bars(symbol)?
            .iter()
            .rev()
            .map(|b| b.close)
            .find(|c| c.is_finite())
            .ok_or_else(|| PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            })
    }

    fn history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<PriceBar>, PaperTradeError> {
        let mut bars = self.load_bars(symbol)?;
        let Some(latest) = bars.last().map(|b| b.date) else {
            return Err(PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            });
        };
        let start = window.start_date(latest);
        bars.retain(|b| b.date > start);
        Ok(bars)
    }
}
