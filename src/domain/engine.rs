//! Trading engine: accounts, market orders, equity and daily marks.

use tracing::{debug, info};

use super::account::{Account, JournalEntry, NewJournalEntry};
use super::clock::{Clock, SystemClock};
use super::error::PaperTradeError;
use super::execution::{ExecutionConfig, OrderRequest, plan_order, validate_quantity};
use super::marks::DailyMark;
use super::trade::{Side, Trade};
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

pub struct TradingEngine<'a> {
    ledger: &'a dyn LedgerPort,
    quotes: &'a dyn QuotePort,
    config: ExecutionConfig,
    clock: &'a dyn Clock,
}

impl<'a> TradingEngine<'a> {
    pub fn new(
        ledger: &'a dyn LedgerPort,
        quotes: &'a dyn QuotePort,
        config: ExecutionConfig,
    ) -> Self {
        TradingEngine {
            ledger,
            quotes,
            config,
            clock: &SystemClock,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Look up an account by name, creating it when absent. An existing
    /// account is returned untouched; `initial_cash` only seeds new ones.
    pub fn ensure_account(
        &self,
        name: &str,
        initial_cash: Option<f64>,
    ) -> Result<Account, PaperTradeError> {
        if let Some(account) = self.ledger.find_account(name)? {
            debug!(account = name, "account already exists");
            return Ok(account);
        }

        let cash = initial_cash.unwrap_or(self.config.default_cash);
        let account = self.ledger.insert_account(name, cash, self.clock.now())?;
        info!(account = name, cash, "created account");
        Ok(account)
    }

    pub fn account(&self, name: &str) -> Result<Account, PaperTradeError> {
        self.ledger
            .find_account(name)?
            .ok_or_else(|| PaperTradeError::account_not_found(name))
    }

    /// Execute a market order at the current quote.
    ///
    /// `side` is parsed case-insensitively; anything other than BUY or SELL
    /// fails with `InvalidSide` before the quote provider is contacted.
    pub fn place_market_order(
        &self,
        account_name: &str,
        symbol: &str,
        side: &str,
        quantity: f64,
        note: Option<&str>,
    ) -> Result<Trade, PaperTradeError> {
        let side: Side = side.parse()?;
        self.place_order(account_name, symbol, side, quantity, note)
    }

    pub fn place_order(
        &self,
        account_name: &str,
        symbol: &str,
        side: Side,
        quantity: f64,
        note: Option<&str>,
    ) -> Result<Trade, PaperTradeError> {
        validate_quantity(quantity)?;
        let account = self.account(account_name)?;
        let quote = self.quotes.last_price(symbol)?;
        let lot = self.ledger.find_lot(account.id, symbol)?;

        let request = OrderRequest {
            account: &account,
            lot: lot.as_ref(),
            symbol,
            side,
            quantity,
            quote,
            note: note.unwrap_or(""),
            filled_at: self.clock.now(),
        };
        let commit = plan_order(&request, &self.config)?;
        let trade = self.ledger.commit_order(&commit)?;

        info!(
            account = account_name,
            symbol,
            side = %side,
            quantity,
            requested = trade.requested_price,
            fill = trade.fill_price,
            cash_after = commit.cash_after,
            "order filled"
        );
        Ok(trade)
    }

    /// Attach a note to an account/symbol pair. Symbol and kind are stored
    /// upper-cased.
    pub fn add_journal(
        &self,
        account_name: &str,
        symbol: &str,
        kind: &str,
        text: &str,
    ) -> Result<JournalEntry, PaperTradeError> {
        let account = self.account(account_name)?;
        let entry = NewJournalEntry::new(account.id, symbol, kind, text, self.clock.now());
        let saved = self.ledger.insert_journal(&entry)?;
        debug!(account = account_name, symbol = %saved.symbol, kind = %saved.kind, "journal entry saved");
        Ok(saved)
    }

    /// Cash plus every open lot valued at its current quote. Any quote
    /// failure fails the whole computation.
    pub fn compute_equity(&self, account_name: &str) -> Result<f64, PaperTradeError> {
        let account = self.account(account_name)?;
        self.equity_of(&account)
    }

    fn equity_of(&self, account: &Account) -> Result<f64, PaperTradeError> {
        let lots = self.ledger.list_lots(account.id)?;
        let mut positions_value = 0.0;
        for lot in &lots {
            let price = self.quotes.last_price(&lot.symbol)?;
            positions_value += lot.market_value(price);
        }
        Ok(account.cash + positions_value)
    }

    /// Append today's equity snapshot. Repeated calls on one day append
    /// repeated rows.
    pub fn mark_to_market(&self, account_name: &str) -> Result<DailyMark, PaperTradeError> {
        let account = self.account(account_name)?;
        let equity = self.equity_of(&account)?;
        let mark =
            self.ledger
                .insert_daily_mark(account.id, self.clock.today(), equity, account.cash)?;
        info!(
            account = account_name,
            date = %mark.marked_on,
            equity,
            cash = account.cash,
            "marked to market"
        );
        Ok(mark)
    }
}
