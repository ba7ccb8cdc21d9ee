//! Benchmark tracking.
//!
//! A benchmark is a synthetic equity curve: seeded once with a starting
//! value and advanced by the reference symbol's latest daily return.

use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::error::PaperTradeError;
use super::marks::BenchmarkMark;
use super::price::HistoryWindow;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

/// History requested when advancing a benchmark.
pub const MARK_WINDOW: HistoryWindow = HistoryWindow::Days(10);

pub struct BenchmarkTracker<'a> {
    ledger: &'a dyn LedgerPort,
    quotes: &'a dyn QuotePort,
    clock: &'a dyn Clock,
}

impl<'a> BenchmarkTracker<'a> {
    pub fn new(ledger: &'a dyn LedgerPort, quotes: &'a dyn QuotePort) -> Self {
        BenchmarkTracker {
            ledger,
            quotes,
            clock: &SystemClock,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Seed `symbol` with `start_value` dated today. Does nothing if any mark
    /// already exists for the symbol. Returns whether a seed was written.
    pub fn init_benchmark(&self, symbol: &str, start_value: f64) -> Result<bool, PaperTradeError> {
        if self.ledger.has_benchmark(symbol)? {
            debug!(symbol, "benchmark already seeded");
            return Ok(false);
        }
        self.ledger
            .insert_benchmark_mark(symbol, self.clock.today(), start_value)?;
        info!(symbol, start_value, "seeded benchmark");
        Ok(true)
    }

    /// Seed every symbol in `symbols` that has no marks yet.
    pub fn ensure_benchmarks(
        &self,
        symbols: &[String],
        start_value: f64,
    ) -> Result<usize, PaperTradeError> {
        let mut seeded = 0;
        for symbol in symbols {
            if self.init_benchmark(symbol, start_value)? {
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    /// Compound the latest session return onto the last recorded value and
    /// append the result dated today. With fewer than two sessions of history
    /// the last mark is returned and nothing is written.
    pub fn mark_benchmark(&self, symbol: &str) -> Result<BenchmarkMark, PaperTradeError> {
        let last = self
            .ledger
            .latest_benchmark_mark(symbol)?
            .ok_or_else(|| PaperTradeError::NotInitialized {
                symbol: symbol.to_string(),
            })?;

        let closes = self.quotes.closes(symbol, MARK_WINDOW)?;
        let Some(ret) = latest_return(&closes) else {
            debug!(symbol, sessions = closes.len(), "not enough sessions to mark");
            return Ok(last);
        };

        let value = last.value * (1.0 + ret);
        let mark = self
            .ledger
            .insert_benchmark_mark(symbol, self.clock.today(), value)?;
        info!(symbol, ret, value, "marked benchmark");
        Ok(mark)
    }
}

/// close[-1] / close[-2] - 1, or `None` with fewer than two closes.
pub fn latest_return(closes: &[f64]) -> Option<f64> {
    match closes {
        [.., prev, last] => Some(last / prev - 1.0),
        _ => None,
    }
}
