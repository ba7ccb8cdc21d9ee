//! Resolved ledger settings.

use std::fmt;
use std::path::PathBuf;

use super::config_validation::{number, validate_ledger_config};
use super::error::PaperTradeError;
use super::execution::ExecutionConfig;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_DB_PATH: &str = "papertrade.db";
pub const DEFAULT_CSV_DIR: &str = "quotes";
pub const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Yahoo,
    Csv,
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteSource::Yahoo => write!(f, "yahoo"),
            QuoteSource::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub db_path: PathBuf,
    pub execution: ExecutionConfig,
    pub quote_source: QuoteSource,
    pub csv_dir: PathBuf,
    pub pool_size: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            execution: ExecutionConfig::default(),
            quote_source: QuoteSource::Yahoo,
            csv_dir: PathBuf::from(DEFAULT_CSV_DIR),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl LedgerSettings {
    /// Validate `config` and resolve every setting, falling back to defaults
    /// for keys it does not define.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PaperTradeError> {
        validate_ledger_config(config)?;
        let defaults = LedgerSettings::default();

        let execution = ExecutionConfig {
            slippage_bps: number(config, "execution", "slippage_bps")?
                .unwrap_or(defaults.execution.slippage_bps),
            commission_per_trade: number(config, "execution", "commission_per_trade")?
                .unwrap_or(defaults.execution.commission_per_trade),
            default_cash: number(config, "ledger", "default_cash")?
                .unwrap_or(defaults.execution.default_cash),
        };

        let quote_source = match config
            .get_string("quotes", "source")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            Some("csv") => QuoteSource::Csv,
            _ => QuoteSource::Yahoo,
        };

        Ok(LedgerSettings {
            db_path: non_empty(config.get_string("ledger", "db_path"))
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            execution,
            quote_source,
            csv_dir: non_empty(config.get_string("quotes", "csv_dir"))
                .map(PathBuf::from)
                .unwrap_or(defaults.csv_dir),
            pool_size: config
                .get_int("ledger", "pool_size", i64::from(DEFAULT_POOL_SIZE))
                .try_into()
                .unwrap_or(DEFAULT_POOL_SIZE),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
