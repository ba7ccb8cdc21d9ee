//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::adapters::csv_quote_adapter::CsvQuoteAdapter;
use crate::adapters::env_config_adapter::EnvConfigAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::adapters::layered_config::LayeredConfig;
use crate::adapters::sqlite_adapter::SqliteAdapter;
#[cfg(feature = "yahoo")]
use crate::adapters::yahoo_quote_adapter::YahooQuoteAdapter;
use crate::domain::benchmark::BenchmarkTracker;
use crate::domain::comparison::{Summary, benchmark_curve, equity_curve, values};
use crate::domain::engine::TradingEngine;
use crate::domain::error::PaperTradeError;
use crate::domain::reports::{self, DEFAULT_TRADE_LIMIT, DashboardRequest};
use crate::domain::screener::{self, parse_symbols};
use crate::domain::settings::{LedgerSettings, QuoteSource};
use crate::domain::trade::{Side, Trade};
use crate::ports::ledger_port::{AccountRepository, BenchmarkRepository, MarkRepository};
use crate::ports::quote_port::QuotePort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_BENCHMARKS: &str = "SPY,QQQ";
pub const DEFAULT_DASHBOARD_PATH: &str = "dashboard.html";
const DASHBOARD_TRADE_LIMIT: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "papertrade", about = "Local paper-trading ledger")]
pub struct Cli {
    /// INI file with [ledger], [execution] and [quotes] sections
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Ledger database path, overrides PAPERTRADE_DB and the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the ledger and the 'core' and 'risk' accounts
    Init {
        #[arg(long)]
        core_cash: Option<f64>,
        #[arg(long)]
        risk_cash: Option<f64>,
    },
    /// Buy at market
    Buy {
        account: String,
        symbol: String,
        qty: f64,
        #[arg(default_value = "")]
        note: String,
    },
    /// Sell at market
    Sell {
        account: String,
        symbol: String,
        qty: f64,
        #[arg(default_value = "")]
        note: String,
    },
    /// Save a journal entry
    Journal {
        account: String,
        symbol: String,
        kind: String,
        text: String,
    },
    /// List recent journal entries
    JournalList {
        account: String,
        #[arg(long, default_value_t = DEFAULT_TRADE_LIMIT)]
        limit: usize,
    },
    /// Record today's equity snapshot
    Mtm { account: String },
    /// Print current equity
    Equity { account: String },
    /// Positions, cash and recent trades
    Show {
        account: String,
        #[arg(long, default_value_t = DEFAULT_TRADE_LIMIT)]
        limit: usize,
    },
    /// Rank a comma-separated symbol list by momentum
    Screen {
        symbols: String,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },
    /// Seed benchmarks with the account's cash
    InitBenchmarks {
        account: String,
        #[arg(long, default_value = DEFAULT_BENCHMARKS)]
        symbols: String,
    },
    /// Mark the account, then each benchmark
    MarkAll {
        account: String,
        #[arg(long, default_value = DEFAULT_BENCHMARKS)]
        benchmarks: String,
    },
    /// Portfolio vs. benchmark returns and drawdowns
    Compare {
        account: String,
        #[arg(long, default_value = "SPY")]
        benchmark: String,
    },
    /// Write an HTML dashboard
    Dashboard {
        account: String,
        #[arg(long, default_value = DEFAULT_BENCHMARKS)]
        benchmarks: String,
        #[arg(short, long, default_value = DEFAULT_DASHBOARD_PATH)]
        output: PathBuf,
        /// Mark the account and benchmarks before rendering
        #[arg(long)]
        update: bool,
    },
}

/// Install the global subscriber. `RUST_LOG` filters (default `warn`);
/// `PAPERTRADE_LOG_FORMAT=json` switches to JSON lines. Output goes to stderr.
pub fn init_tracing() {
    let log_format = std::env::var("PAPERTRADE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        debug!("tracing subscriber already installed");
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Resolve settings from, in priority order: the environment, the INI file
/// at `config_path`, and built-in defaults. `db_override` wins over all.
pub fn load_settings(
    config_path: Option<&Path>,
    db_override: Option<&Path>,
) -> Result<LedgerSettings, PaperTradeError> {
    let mut layers = LayeredConfig::new().with_layer(Box::new(EnvConfigAdapter::from_env()));
    if let Some(path) = config_path {
        layers = layers.with_layer(Box::new(FileConfigAdapter::from_file(path)?));
    }
    let mut settings = LedgerSettings::from_config(&layers)?;
    if let Some(db) = db_override {
        settings.db_path = db.to_path_buf();
    }
    debug!(db = %settings.db_path.display(), quotes = %settings.quote_source, "settings loaded");
    Ok(settings)
}

pub fn build_quotes(settings: &LedgerSettings) -> Result<Box<dyn QuotePort>, PaperTradeError> {
    match settings.quote_source {
        QuoteSource::Csv => Ok(Box::new(CsvQuoteAdapter::new(settings.csv_dir.clone()))),
        #[cfg(feature = "yahoo")]
        QuoteSource::Yahoo => Ok(Box::new(YahooQuoteAdapter::new()?)),
        #[cfg(not(feature = "yahoo"))]
        QuoteSource::Yahoo => Err(PaperTradeError::ConfigInvalid {
            section: "quotes".into(),
            key: "source".into(),
            reason: "built without the yahoo feature".into(),
        }),
    }
}

/// Everything a command needs: settings, the ledger and a quote source.
pub struct Session {
    pub settings: LedgerSettings,
    pub ledger: SqliteAdapter,
    pub quotes: Box<dyn QuotePort>,
}

impl Session {
    pub fn open(settings: LedgerSettings) -> Result<Self, PaperTradeError> {
        let ledger = SqliteAdapter::from_settings(&settings)?;
        ledger.initialize_schema()?;
        let quotes = build_quotes(&settings)?;
        Ok(Session {
            settings,
            ledger,
            quotes,
        })
    }

    pub fn engine(&self) -> TradingEngine<'_> {
        TradingEngine::new(
            &self.ledger,
            self.quotes.as_ref(),
            self.settings.execution.clone(),
        )
    }

    pub fn benchmarks(&self) -> BenchmarkTracker<'_> {
        BenchmarkTracker::new(&self.ledger, self.quotes.as_ref())
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode, PaperTradeError> {
    let settings = load_settings(cli.config.as_deref(), cli.db.as_deref())?;

    match cli.command {
        Command::Screen { symbols, top_n } => {
            let quotes = build_quotes(&settings)?;
            Ok(run_screen(quotes.as_ref(), &symbols, top_n))
        }
        command => {
            let session = Session::open(settings)?;
            run_ledger_command(&session, command)
        }
    }
}

fn run_ledger_command(session: &Session, command: Command) -> Result<ExitCode, PaperTradeError> {
    match command {
        Command::Init {
            core_cash,
            risk_cash,
        } => run_init(session, core_cash, risk_cash),
        Command::Buy {
            account,
            symbol,
            qty,
            note,
        } => run_order(session, &account, &symbol, Side::Buy, qty, &note),
        Command::Sell {
            account,
            symbol,
            qty,
            note,
        } => run_order(session, &account, &symbol, Side::Sell, qty, &note),
        Command::Journal {
            account,
            symbol,
            kind,
            text,
        } => {
            session.engine().add_journal(&account, &symbol, &kind, &text)?;
            println!("Journal entry saved.");
            Ok(())
        }
        Command::JournalList { account, limit } => run_journal_list(session, &account, limit),
        Command::Mtm { account } => {
            let mark = session.engine().mark_to_market(&account)?;
            println!(
                "MTM {account}: equity={:.2} cash={:.2}",
                mark.equity, mark.cash
            );
            Ok(())
        }
        Command::Equity { account } => {
            let equity = session.engine().compute_equity(&account)?;
            println!("{account} equity: {equity:.2}");
            Ok(())
        }
        Command::Show { account, limit } => run_show(session, &account, limit),
        Command::Screen { .. } => unreachable!("screen is dispatched without a session"),
        Command::InitBenchmarks { account, symbols } => {
            run_init_benchmarks(session, &account, &symbols)
        }
        Command::MarkAll {
            account,
            benchmarks,
        } => run_mark_all(session, &account, &parse_symbols(&benchmarks)),
        Command::Compare { account, benchmark } => {
            run_compare(session, &account, &benchmark.trim().to_uppercase())
        }
        Command::Dashboard {
            account,
            benchmarks,
            output,
            update,
        } => run_dashboard(session, &account, &parse_symbols(&benchmarks), &output, update),
    }?;
    Ok(ExitCode::SUCCESS)
}

fn run_init(
    session: &Session,
    core_cash: Option<f64>,
    risk_cash: Option<f64>,
) -> Result<(), PaperTradeError> {
    let engine = session.engine();
    let explicit: Vec<(&str, f64)> = [("core", core_cash), ("risk", risk_cash)]
        .into_iter()
        .filter_map(|(name, cash)| cash.filter(|c| *c > 0.0).map(|c| (name, c)))
        .collect();

    if explicit.is_empty() {
        engine.ensure_account("core", None)?;
        engine.ensure_account("risk", None)?;
    } else {
        for (name, cash) in explicit {
            engine.ensure_account(name, Some(cash))?;
        }
    }
    println!("Initialized {}.", session.settings.db_path.display());
    for account in session.ledger.list_accounts()? {
        println!("  {:<8} cash={:.2}", account.name, account.cash);
    }
    Ok(())
}

fn run_order(
    session: &Session,
    account: &str,
    symbol: &str,
    side: Side,
    qty: f64,
    note: &str,
) -> Result<(), PaperTradeError> {
    let symbol = symbol.trim().to_uppercase();
    let note = (!note.is_empty()).then_some(note);
    let trade = session
        .engine()
        .place_order(account, &symbol, side, qty, note)?;
    println!(
        "{} {} {} @ {:.2} (req {:.2})",
        trade.side, trade.quantity, trade.symbol, trade.fill_price, trade.requested_price
    );
    Ok(())
}

fn run_journal_list(session: &Session, account: &str, limit: usize) -> Result<(), PaperTradeError> {
    let entries = reports::recent_journal(&session.ledger, account, limit)?;
    if entries.is_empty() {
        println!("No journal entries for {account}.");
        return Ok(());
    }
    println!("{:<20} {:<8} {:<10} Text", "Time", "Symbol", "Kind");
    for entry in entries {
        println!(
            "{:<20} {:<8} {:<10} {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.symbol,
            entry.kind,
            entry.text
        );
    }
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

fn print_trades(trades: &[Trade]) {
    println!("\n=== Recent Trades ===");
    if trades.is_empty() {
        println!("(none)");
        return;
    }
    println!(
        "{:<20} {:<5} {:<8} {:>12} {:>10} Note",
        "Time", "Side", "Symbol", "Qty", "Fill"
    );
    for t in trades {
        println!(
            "{:<20} {:<5} {:<8} {:>12.4} {:>10.2} {}",
            t.filled_at.format("%Y-%m-%d %H:%M:%S"),
            t.side,
            t.symbol,
            t.quantity,
            t.fill_price,
            t.note
        );
    }
}

fn run_show(session: &Session, account: &str, limit: usize) -> Result<(), PaperTradeError> {
    let overview = reports::overview(&session.ledger, session.quotes.as_ref(), account, limit)?;

    println!("=== Positions ({account}) ===");
    if overview.positions.is_empty() {
        println!("(none)");
    } else {
        println!(
            "{:<8} {:>12} {:>10} {:>10} {:>12} {:>10}",
            "Symbol", "Qty", "Avg Cost", "Last", "Mkt Value", "PnL"
        );
        for row in &overview.positions {
            println!(
                "{:<8} {:>12.4} {:>10.2} {:>10} {:>12} {:>10}",
                row.symbol,
                row.quantity,
                row.avg_cost,
                optional(row.last),
                optional(row.market_value),
                optional(row.pnl)
            );
        }
    }
    println!("Cash: {:.2}", overview.account.cash);
    print_trades(&overview.trades);
    Ok(())
}

fn run_screen(quotes: &dyn QuotePort, symbols: &str, top_n: usize) -> ExitCode {
    let symbols = parse_symbols(symbols);
    let rows = screener::screen(quotes, &symbols, top_n);
    if rows.is_empty() {
        eprintln!("No results.");
        return ExitCode::FAILURE;
    }

    println!(
        "{:<8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>11}",
        "symbol", "score", "ret_1m", "ret_3m", "ret_6m", "vol_20d", "above_sma50"
    );
    for r in rows {
        println!(
            "{:<8} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>11}",
            r.symbol, r.score, r.ret_1m, r.ret_3m, r.ret_6m, r.vol_20d, r.above_sma50
        );
    }
    ExitCode::SUCCESS
}

fn run_init_benchmarks(
    session: &Session,
    account: &str,
    symbols: &str,
) -> Result<(), PaperTradeError> {
    let account = reports::find_account(&session.ledger, account)?;
    let seeded = session
        .benchmarks()
        .ensure_benchmarks(&parse_symbols(symbols), account.cash)?;
    println!("Benchmarks initialized ({seeded} new).");
    Ok(())
}

fn run_mark_all(
    session: &Session,
    account: &str,
    benchmarks: &[String],
) -> Result<(), PaperTradeError> {
    session.engine().mark_to_market(account)?;
    let tracker = session.benchmarks();
    for symbol in benchmarks {
        tracker.mark_benchmark(symbol)?;
    }
    println!("Marked portfolio + benchmarks.");
    Ok(())
}

fn run_compare(session: &Session, account: &str, benchmark: &str) -> Result<(), PaperTradeError> {
    let account = reports::find_account(&session.ledger, account)?;
    let portfolio = values(&equity_curve(&session.ledger.daily_marks(account.id)?));
    let bench = values(&benchmark_curve(&session.ledger.benchmark_marks(benchmark)?));
    let stats = Summary::compute(&portfolio, &bench)?;

    println!("Portfolio vs {benchmark}\n");
    println!("Return:       {:.2}%", stats.portfolio_return * 100.0);
    println!("Benchmark:    {:.2}%", stats.benchmark_return * 100.0);
    println!("Alpha:        {:.2}%\n", stats.alpha * 100.0);
    println!("Max DD (you): {:.2}%", stats.portfolio_max_dd * 100.0);
    println!("Max DD (bm):  {:.2}%", stats.benchmark_max_dd * 100.0);
    Ok(())
}

/// Mark the account, seed missing benchmarks with current equity and mark
/// them. Benchmark failures are logged and skipped.
fn update_marks(
    session: &Session,
    account: &str,
    benchmarks: &[String],
) -> Result<(), PaperTradeError> {
    let engine = session.engine();
    engine.mark_to_market(account)?;
    let equity = engine.compute_equity(account)?;

    let tracker = session.benchmarks();
    tracker.ensure_benchmarks(benchmarks, equity)?;
    for symbol in benchmarks {
        if let Err(e) = tracker.mark_benchmark(symbol) {
            warn!(symbol = %symbol, error = %e, "benchmark mark failed");
        }
    }
    Ok(())
}

fn run_dashboard(
    session: &Session,
    account: &str,
    benchmarks: &[String],
    output: &Path,
    update: bool,
) -> Result<(), PaperTradeError> {
    if update {
        update_marks(session, account, benchmarks)?;
    }

    let engine = session.engine();
    let equity = match engine.compute_equity(account) {
        Ok(equity) => equity,
        Err(e @ PaperTradeError::NotFound { .. }) => return Err(e),
        Err(e) => {
            warn!(account, error = %e, "equity unavailable, showing cash");
            engine.account(account)?.cash
        }
    };

    let request = DashboardRequest {
        account_name: account,
        equity,
        benchmarks,
        trade_limit: DASHBOARD_TRADE_LIMIT,
        generated_on: Local::now().date_naive(),
    };
    let dashboard = reports::build_dashboard(&session.ledger, session.quotes.as_ref(), &request)?;

    let output = output.to_string_lossy();
    HtmlReportAdapter::new().write_dashboard(&dashboard, &output)?;
    println!("Dashboard written to: {output}");
    Ok(())
}
