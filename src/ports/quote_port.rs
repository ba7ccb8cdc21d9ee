//! Market quote port.

use crate::domain::error::PaperTradeError;
use crate::domain::price::{HistoryWindow, PriceBar, closes};

pub trait QuotePort {
    /// Latest traded price. Fails with `NoPriceData` when none is available.
    fn last_price(&self, symbol: &str) -> Result<f64, PaperTradeError>;

    /// Daily bars over the trailing window, oldest first. Never empty on `Ok`.
    fn history(&self, symbol: &str, window: HistoryWindow)
    -> Result<Vec<PriceBar>, PaperTradeError>;

    /// Closing prices over the trailing window, oldest first.
    fn closes(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<f64>, PaperTradeError> {
        self.history(symbol, window).map(|bars| closes(&bars))
    }
}
