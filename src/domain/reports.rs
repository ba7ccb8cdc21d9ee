//! Read-side views: positions, recent trades, journal and the dashboard.

use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::warn;

use super::account::{Account, JournalEntry};
use super::comparison::{
    EquityPoint, SeriesStats, align_to, benchmark_curve, equity_curve, normalize_to_100,
};
use super::error::PaperTradeError;
use super::trade::Trade;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_TRADE_LIMIT: usize = 20;

/// An open lot valued at the current quote. Valuation fields are `None`
/// when the quote provider had no price for the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub last: Option<f64>,
    pub market_value: Option<f64>,
    pub pnl: Option<f64>,
}

/// Value every open lot of `account`, largest market value first.
pub fn positions(
    ledger: &dyn LedgerPort,
    quotes: &dyn QuotePort,
    account: &Account,
) -> Result<Vec<PositionRow>, PaperTradeError> {
    let lots = ledger.list_lots(account.id)?;
    let mut rows: Vec<PositionRow> = lots
        .iter()
        .map(|lot| {
            let last = match quotes.last_price(&lot.symbol) {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!(symbol = %lot.symbol, error = %e, "no quote for position");
                    None
                }
            };
            PositionRow {
                symbol: lot.symbol.clone(),
                quantity: lot.quantity,
                avg_cost: lot.avg_cost,
                last,
                market_value: last.map(|p| lot.market_value(p)),
                pnl: last.map(|p| lot.unrealized_pnl(p)),
            }
        })
        .collect();

    rows.sort_by(|a, b| match (a.market_value, b.market_value) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.symbol.cmp(&b.symbol),
    });
    Ok(rows)
}

pub fn find_account(ledger: &dyn LedgerPort, name: &str) -> Result<Account, PaperTradeError> {
    ledger
        .find_account(name)?
        .ok_or_else(|| PaperTradeError::account_not_found(name))
}

pub fn recent_trades(
    ledger: &dyn LedgerPort,
    account_name: &str,
    limit: usize,
) -> Result<Vec<Trade>, PaperTradeError> {
    let account = find_account(ledger, account_name)?;
    ledger.recent_trades(account.id, limit)
}

pub fn recent_journal(
    ledger: &dyn LedgerPort,
    account_name: &str,
    limit: usize,
) -> Result<Vec<JournalEntry>, PaperTradeError> {
    let account = find_account(ledger, account_name)?;
    ledger.recent_journal(account.id, limit)
}

/// Positions, cash and recent trades for one account.
#[derive(Debug, Clone)]
pub struct AccountOverview {
    pub account: Account,
    pub positions: Vec<PositionRow>,
    pub trades: Vec<Trade>,
}

pub fn overview(
    ledger: &dyn LedgerPort,
    quotes: &dyn QuotePort,
    account_name: &str,
    trade_limit: usize,
) -> Result<AccountOverview, PaperTradeError> {
    let account = find_account(ledger, account_name)?;
    let positions = positions(ledger, quotes, &account)?;
    let trades = ledger.recent_trades(account.id, trade_limit)?;
    Ok(AccountOverview {
        account,
        positions,
        trades,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSeries {
    pub symbol: String,
    pub curve: Vec<EquityPoint>,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub account: Account,
    pub generated_on: NaiveDate,
    pub equity: f64,
    pub positions: Vec<PositionRow>,
    pub trades: Vec<Trade>,
    /// Portfolio equity rebased to 100.
    pub portfolio: Vec<EquityPoint>,
    /// Benchmarks rebased to 100, aligned to portfolio dates when the
    /// portfolio has marks.
    pub benchmarks: Vec<BenchmarkSeries>,
    pub stats: Vec<SeriesStats>,
}

pub struct DashboardRequest<'a> {
    pub account_name: &'a str,
    pub equity: f64,
    pub benchmarks: &'a [String],
    pub trade_limit: usize,
    pub generated_on: NaiveDate,
}

pub fn build_dashboard(
    ledger: &dyn LedgerPort,
    quotes: &dyn QuotePort,
    request: &DashboardRequest<'_>,
) -> Result<Dashboard, PaperTradeError> {
    let AccountOverview {
        account,
        positions,
        trades,
    } = overview(ledger, quotes, request.account_name, request.trade_limit)?;

    let portfolio = normalize_to_100(&equity_curve(&ledger.daily_marks(account.id)?));

    let mut benchmarks = Vec::with_capacity(request.benchmarks.len());
    for symbol in request.benchmarks {
        let normalized = normalize_to_100(&benchmark_curve(&ledger.benchmark_marks(symbol)?));
        if normalized.is_empty() {
            continue;
        }
        let curve = if portfolio.is_empty() {
            normalized
        } else {
            align_to(&portfolio, &normalized)
        };
        benchmarks.push(BenchmarkSeries {
            symbol: symbol.clone(),
            curve,
        });
    }

    let mut stats = Vec::new();
    if let Some(row) = SeriesStats::from_curve("Portfolio", &portfolio) {
        stats.push(row);
        stats.extend(
            benchmarks
                .iter()
                .filter_map(|b| SeriesStats::from_curve(&b.symbol, &b.curve)),
        );
    }

    Ok(Dashboard {
        account,
        generated_on: request.generated_on,
        equity: request.equity,
        positions,
        trades,
        portfolio,
        benchmarks,
        stats,
    })
}
