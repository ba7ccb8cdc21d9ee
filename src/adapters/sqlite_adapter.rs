//! SQLite ledger adapter.
//!
//! Dates are stored as `YYYY-MM-DD` text and timestamps as RFC 3339 text.

use crate::domain::account::{Account, JournalEntry, NewJournalEntry};
use crate::domain::error::PaperTradeError;
use crate::domain::execution::{LotChange, OrderCommit};
use crate::domain::marks::{BenchmarkMark, DailyMark};
use crate::domain::position::PositionLot;
use crate::domain::settings::LedgerSettings;
use crate::domain::trade::{Side, Trade};
use crate::ports::ledger_port::{
    AccountRepository, BenchmarkRepository, JournalRepository, LedgerPort, MarkRepository,
    PositionRepository, TradeRepository,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, params};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS account (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        cash REAL NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_account_name ON account(name);

    CREATE TABLE IF NOT EXISTS position_lot (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES account(id),
        symbol TEXT NOT NULL,
        quantity REAL NOT NULL,
        avg_cost REAL NOT NULL,
        opened_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_position_lot_account_symbol
        ON position_lot(account_id, symbol);

    CREATE TABLE IF NOT EXISTS trade (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES account(id),
        symbol TEXT NOT NULL,
        side TEXT NOT NULL,
        quantity REAL NOT NULL,
        requested_price REAL NOT NULL,
        fill_price REAL NOT NULL,
        commission REAL NOT NULL,
        slippage_bps REAL NOT NULL,
        filled_at TEXT NOT NULL,
        note TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_trade_account ON trade(account_id);
    CREATE INDEX IF NOT EXISTS idx_trade_symbol ON trade(symbol);

    CREATE TABLE IF NOT EXISTS daily_mark (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES account(id),
        marked_on TEXT NOT NULL,
        equity REAL NOT NULL,
        cash REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_daily_mark_account_date ON daily_mark(account_id, marked_on);

    CREATE TABLE IF NOT EXISTS benchmark_mark (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        marked_on TEXT NOT NULL,
        value REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_benchmark_mark_symbol_date ON benchmark_mark(symbol, marked_on);

    CREATE TABLE IF NOT EXISTS journal (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES account(id),
        symbol TEXT NOT NULL,
        kind TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_journal_account ON journal(account_id);";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> PaperTradeError {
    PaperTradeError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> PaperTradeError {
    PaperTradeError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_error(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

/// Fixed-width UTC text, so timestamps order correctly as strings.
fn timestamp_text(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        cash: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

fn lot_from_row(row: &Row<'_>) -> rusqlite::Result<PositionLot> {
    Ok(PositionLot {
        id: row.get(0)?,
        account_id: row.get(1)?,
        symbol: row.get(2)?,
        quantity: row.get(3)?,
        avg_cost: row.get(4)?,
        opened_at: timestamp_column(row, 5)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let side: String = row.get(3)?;
    let side: Side = side.parse().map_err(|e| conversion_error(3, e))?;
    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        symbol: row.get(2)?,
        side,
        quantity: row.get(4)?,
        requested_price: row.get(5)?,
        fill_price: row.get(6)?,
        commission: row.get(7)?,
        slippage_bps: row.get(8)?,
        filled_at: timestamp_column(row, 9)?,
        note: row.get(10)?,
    })
}

fn daily_mark_from_row(row: &Row<'_>) -> rusqlite::Result<DailyMark> {
    Ok(DailyMark {
        id: row.get(0)?,
        account_id: row.get(1)?,
        marked_on: date_column(row, 2)?,
        equity: row.get(3)?,
        cash: row.get(4)?,
    })
}

fn benchmark_mark_from_row(row: &Row<'_>) -> rusqlite::Result<BenchmarkMark> {
    Ok(BenchmarkMark {
        id: row.get(0)?,
        symbol: row.get(1)?,
        marked_on: date_column(row, 2)?,
        value: row.get(3)?,
    })
}

fn journal_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        symbol: row.get(2)?,
        kind: row.get(3)?,
        text: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

impl SqliteAdapter {
    pub fn from_settings(settings: &LedgerSettings) -> Result<Self, PaperTradeError> {
        Self::open(&settings.db_path, settings.pool_size)
    }

    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, PaperTradeError> {
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(pool_error)?;
        debug!(path = %path.as_ref().display(), pool_size, "opened ledger");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PaperTradeError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    /// Create all tables and indexes. Safe to run on an existing ledger.
    pub fn initialize_schema(&self) -> Result<(), PaperTradeError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).map_err(query_error)?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PaperTradeError> {
        self.pool.get().map_err(pool_error)
    }

    fn query_all<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, PaperTradeError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let rows = stmt.query_map(params, map).map_err(query_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(query_error)?);
        }
        Ok(out)
    }

    fn query_one<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, PaperTradeError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn()?;
        conn.query_row(sql, params, map)
            .optional()
            .map_err(query_error)
    }
}

impl AccountRepository for SqliteAdapter {
    fn find_account(&self, name: &str) -> Result<Option<Account>, PaperTradeError> {
        self.query_one(
            "SELECT id, name, cash, created_at FROM account WHERE name = ?1",
            params![name],
            account_from_row,
        )
    }

    fn insert_account(
        &self,
        name: &str,
        cash: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Account, PaperTradeError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO account (name, cash, created_at) VALUES (?1, ?2, ?3)",
            params![name, cash, timestamp_text(created_at)],
        )
        .map_err(query_error)?;

        Ok(Account {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            cash,
            created_at,
        })
    }

    fn list_accounts(&self) -> Result<Vec<Account>, PaperTradeError> {
        self.query_all(
            "SELECT id, name, cash, created_at FROM account ORDER BY name",
            [],
            account_from_row,
        )
    }
}

impl PositionRepository for SqliteAdapter {
    fn find_lot(
        &self,
        account_id: i64,
        symbol: &str,
    ) -> Result<Option<PositionLot>, PaperTradeError> {
        self.query_one(
            "SELECT id, account_id, symbol, quantity, avg_cost, opened_at
             FROM position_lot WHERE account_id = ?1 AND symbol = ?2",
            params![account_id, symbol],
            lot_from_row,
        )
    }

    fn list_lots(&self, account_id: i64) -> Result<Vec<PositionLot>, PaperTradeError> {
        self.query_all(
            "SELECT id, account_id, symbol, quantity, avg_cost, opened_at
             FROM position_lot WHERE account_id = ?1 ORDER BY symbol",
            params![account_id],
            lot_from_row,
        )
    }
}

impl TradeRepository for SqliteAdapter {
    fn recent_trades(&self, account_id: i64, limit: usize) -> Result<Vec<Trade>, PaperTradeError> {
        self.query_all(
            "SELECT id, account_id, symbol, side, quantity, requested_price, fill_price,
                    commission, slippage_bps, filled_at, note
             FROM trade WHERE account_id = ?1
             ORDER BY filled_at DESC, id DESC LIMIT ?2",
            params![account_id, i64::try_from(limit).unwrap_or(i64::MAX)],
            trade_from_row,
        )
    }
}

impl MarkRepository for SqliteAdapter {
    fn insert_daily_mark(
        &self,
        account_id: i64,
        marked_on: NaiveDate,
        equity: f64,
        cash: f64,
    ) -> Result<DailyMark, PaperTradeError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO daily_mark (account_id, marked_on, equity, cash) VALUES (?1, ?2, ?3, ?4)",
            params![account_id, format_date(marked_on), equity, cash],
        )
        .map_err(query_error)?;

        Ok(DailyMark {
            id: conn.last_insert_rowid(),
            account_id,
            marked_on,
            equity,
            cash,
        })
    }

    fn daily_marks(&self, account_id: i64) -> Result<Vec<DailyMark>, PaperTradeError> {
        self.query_all(
            "SELECT id, account_id, marked_on, equity, cash
             FROM daily_mark WHERE account_id = ?1 ORDER BY marked_on, id",
            params![account_id],
            daily_mark_from_row,
        )
    }
}

impl BenchmarkRepository for SqliteAdapter {
    fn has_benchmark(&self, symbol: &str) -> Result<bool, PaperTradeError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM benchmark_mark WHERE symbol = ?1)",
            params![symbol],
            |row| row.get(0),
        )
        .map_err(query_error)
    }

    fn latest_benchmark_mark(
        &self,
        symbol: &str,
    ) -> Result<Option<BenchmarkMark>, PaperTradeError> {
        self.query_one(
            "SELECT id, symbol, marked_on, value FROM benchmark_mark
             WHERE symbol = ?1 ORDER BY marked_on DESC, id DESC LIMIT 1",
            params![symbol],
            benchmark_mark_from_row,
        )
    }

    fn insert_benchmark_mark(
        &self,
        symbol: &str,
        marked_on: NaiveDate,
        value: f64,
    ) -> Result<BenchmarkMark, PaperTradeError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO benchmark_mark (symbol, marked_on, value) VALUES (?1, ?2, ?3)",
            params![symbol, format_date(marked_on), value],
        )
        .map_err(query_error)?;

        Ok(BenchmarkMark {
            id: conn.last_insert_rowid(),
            symbol: symbol.to_string(),
            marked_on,
            value,
        })
    }

    fn benchmark_marks(&self, symbol: &str) -> Result<Vec<BenchmarkMark>, PaperTradeError> {
        self.query_all(
            "SELECT id, symbol, marked_on, value FROM benchmark_mark
             WHERE symbol = ?1 ORDER BY marked_on, id",
            params![symbol],
            benchmark_mark_from_row,
        )
    }
}

impl JournalRepository for SqliteAdapter {
    fn insert_journal(&self, entry: &NewJournalEntry) -> Result<JournalEntry, PaperTradeError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO journal (account_id, symbol, kind, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.account_id,
                entry.symbol,
                entry.kind,
                entry.text,
                timestamp_text(entry.created_at)
            ],
        )
        .map_err(query_error)?;

        Ok(JournalEntry {
            id: conn.last_insert_rowid(),
            account_id: entry.account_id,
            symbol: entry.symbol.clone(),
            kind: entry.kind.clone(),
            text: entry.text.clone(),
            created_at: entry.created_at,
        })
    }

    fn recent_journal(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, PaperTradeError> {
        self.query_all(
            "SELECT id, account_id, symbol, kind, text, created_at
             FROM journal WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            params![account_id, i64::try_from(limit).unwrap_or(i64::MAX)],
            journal_from_row,
        )
    }
}

impl LedgerPort for SqliteAdapter {
    fn commit_order(&self, commit: &OrderCommit) -> Result<Trade, PaperTradeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        let updated = tx
            .execute(
                "UPDATE account SET cash = ?1 WHERE id = ?2",
                params![commit.cash_after, commit.account_id],
            )
            .map_err(query_error)?;
        if updated != 1 {
            return Err(PaperTradeError::DatabaseQuery {
                reason: format!("account id {} does not exist", commit.account_id),
            });
        }

        match &commit.lot_change {
            LotChange::Open {
                symbol,
                quantity,
                avg_cost,
            } => {
                tx.execute(
                    "INSERT INTO position_lot (account_id, symbol, quantity, avg_cost, opened_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        commit.account_id,
                        symbol,
                        quantity,
                        avg_cost,
                        timestamp_text(commit.trade.filled_at)
                    ],
                )
                .map_err(query_error)?;
            }
            LotChange::Update {
                lot_id,
                quantity,
                avg_cost,
            } => {
                tx.execute(
                    "UPDATE position_lot SET quantity = ?1, avg_cost = ?2 WHERE id = ?3",
                    params![quantity, avg_cost, lot_id],
                )
                .map_err(query_error)?;
            }
            LotChange::Close { lot_id } => {
                tx.execute("DELETE FROM position_lot WHERE id = ?1", params![lot_id])
                    .map_err(query_error)?;
            }
        }

        let t = &commit.trade;
        tx.execute(
            "INSERT INTO trade (account_id, symbol, side, quantity, requested_price, fill_price,
                                commission, slippage_bps, filled_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                t.account_id,
                t.symbol,
                t.side.as_str(),
                t.quantity,
                t.requested_price,
                t.fill_price,
                t.commission,
                t.slippage_bps,
                timestamp_text(t.filled_at),
                t.note
            ],
        )
        .map_err(query_error)?;
        let trade_id = tx.last_insert_rowid();

        tx.commit().map_err(query_error)?;
        Ok(t.clone().with_id(trade_id))
    }
}
