//! Momentum screener.
//!
//! Scores symbols on trailing returns over a six-month daily window:
//! - ret_1m: last close vs. the close 21 sessions back
//! - ret_3m: last close vs. the close 63 sessions back
//! - ret_6m: last close vs. the oldest close in the window
//! - vol_20d: sample stddev of the last 20 daily percent changes
//! - above_sma50: last close above the 50-session simple average
//!
//! score = ret_1m + ret_3m

use std::cmp::Ordering;
use tracing::debug;

use super::error::PaperTradeError;
use super::price::HistoryWindow;
use crate::ports::quote_port::QuotePort;

pub const SCREEN_WINDOW: HistoryWindow = HistoryWindow::Months(6);
pub const MIN_SESSIONS: usize = 60;

const ONE_MONTH: usize = 21;
const THREE_MONTHS: usize = 63;
const VOL_WINDOW: usize = 20;
const SMA_WINDOW: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumScore {
    pub symbol: String,
    pub ret_1m: f64,
    pub ret_3m: f64,
    pub ret_6m: f64,
    pub vol_20d: f64,
    pub above_sma50: bool,
    pub score: f64,
}

pub fn momentum_score(
    quotes: &dyn QuotePort,
    symbol: &str,
) -> Result<MomentumScore, PaperTradeError> {
    let closes = quotes.closes(symbol, SCREEN_WINDOW)?;
    score_closes(symbol, &closes)
}

/// Score a series of daily closes, oldest first.
pub fn score_closes(symbol: &str, closes: &[f64]) -> Result<MomentumScore, PaperTradeError> {
    let n = closes.len();
    if n < MIN_SESSIONS {
        return Err(PaperTradeError::InsufficientHistory {
            symbol: symbol.to_string(),
            have: n,
            need: MIN_SESSIONS,
        });
    }
    // ret_3m needs a close a full three months back.
    if n < THREE_MONTHS {
        return Err(PaperTradeError::InsufficientHistory {
            symbol: symbol.to_string(),
            have: n,
            need: THREE_MONTHS,
        });
    }

    let last = closes[n - 1];
    let ret_1m = last / closes[n - ONE_MONTH] - 1.0;
    let ret_3m = last / closes[n - THREE_MONTHS] - 1.0;
    let ret_6m = last / closes[0] - 1.0;

    let changes = pct_changes(&closes[n - VOL_WINDOW - 1..]);
    let vol_20d = sample_stddev(&changes);

    let sma50 = closes[n - SMA_WINDOW..].iter().sum::<f64>() / SMA_WINDOW as f64;
    let above_sma50 = last > sma50;

    Ok(MomentumScore {
        symbol: symbol.to_string(),
        ret_1m,
        ret_3m,
        ret_6m,
        vol_20d,
        above_sma50,
        score: ret_1m + ret_3m,
    })
}

/// Score every symbol, drop the ones that fail, rank by score descending
/// and keep the first `top_n`.
pub fn screen(quotes: &dyn QuotePort, symbols: &[String], top_n: usize) -> Vec<MomentumScore> {
    let mut rows: Vec<MomentumScore> = symbols
        .iter()
        .filter_map(|symbol| match momentum_score(quotes, symbol) {
            Ok(row) => Some(row),
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "skipping symbol");
                None
            }
        })
        .collect();

    rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    rows.truncate(top_n);
    rows
}

/// Split a comma-separated symbol list, trimming and upper-casing entries.
pub fn parse_symbols(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn pct_changes(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
