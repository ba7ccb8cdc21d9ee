//! Ledger persistence ports, one repository per entity.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::account::{Account, JournalEntry, NewJournalEntry};
use crate::domain::error::PaperTradeError;
use crate::domain::execution::OrderCommit;
use crate::domain::marks::{BenchmarkMark, DailyMark};
use crate::domain::position::PositionLot;
use crate::domain::trade::Trade;

pub trait AccountRepository {
    fn find_account(&self, name: &str) -> Result<Option<Account>, PaperTradeError>;

    fn insert_account(
        &self,
        name: &str,
        cash: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Account, PaperTradeError>;

    /// All accounts ordered by name.
    fn list_accounts(&self) -> Result<Vec<Account>, PaperTradeError>;
}

pub trait PositionRepository {
    fn find_lot(&self, account_id: i64, symbol: &str)
    -> Result<Option<PositionLot>, PaperTradeError>;

    fn list_lots(&self, account_id: i64) -> Result<Vec<PositionLot>, PaperTradeError>;
}

pub trait TradeRepository {
    /// Newest first.
    fn recent_trades(&self, account_id: i64, limit: usize) -> Result<Vec<Trade>, PaperTradeError>;
}

pub trait MarkRepository {
    fn insert_daily_mark(
        &self,
        account_id: i64,
        marked_on: NaiveDate,
        equity: f64,
        cash: f64,
    ) -> Result<DailyMark, PaperTradeError>;

    /// Ordered by date, then insertion.
    fn daily_marks(&self, account_id: i64) -> Result<Vec<DailyMark>, PaperTradeError>;
}

pub trait BenchmarkRepository {
    fn has_benchmark(&self, symbol: &str) -> Result<bool, PaperTradeError>;

    /// Most recent mark by date; same-day ties go to the latest row.
    fn latest_benchmark_mark(&self, symbol: &str)
    -> Result<Option<BenchmarkMark>, PaperTradeError>;

    fn insert_benchmark_mark(
        &self,
        symbol: &str,
        marked_on: NaiveDate,
        value: f64,
    ) -> Result<BenchmarkMark, PaperTradeError>;

    /// Ordered by date, then insertion.
    fn benchmark_marks(&self, symbol: &str) -> Result<Vec<BenchmarkMark>, PaperTradeError>;
}

pub trait JournalRepository {
    fn insert_journal(&self, entry: &NewJournalEntry) -> Result<JournalEntry, PaperTradeError>;

    /// Newest first.
    fn recent_journal(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, PaperTradeError>;
}

/// The full ledger store.
pub trait LedgerPort:
    AccountRepository
    + PositionRepository
    + TradeRepository
    + MarkRepository
    + BenchmarkRepository
    + JournalRepository
{
    /// Apply the cash update, lot change and trade insert of one order
    /// atomically: either all three are persisted or none is.
    fn commit_order(&self, commit: &OrderCommit) -> Result<Trade, PaperTradeError>;
}
