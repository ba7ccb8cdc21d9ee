//! Configuration validation.
//!
//! Checks every ledger setting before any command touches the store.

use crate::domain::error::PaperTradeError;
use crate::ports::config_port::ConfigPort;

pub const QUOTE_SOURCES: [&str; 2] = ["yahoo", "csv"];

pub fn validate_ledger_config(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    validate_slippage(config)?;
    validate_commission(config)?;
    validate_default_cash(config)?;
    validate_pool_size(config)?;
    validate_quote_source(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PaperTradeError {
    PaperTradeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse `[section] key` as a number when present. Unparseable text is an
/// error rather than a silent fallback to the default.
pub(crate) fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, PaperTradeError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, format!("'{raw}' is not a number"))),
        },
    }
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    if let Some(value) = number(config, "execution", "slippage_bps")? {
        if value < 0.0 {
            return Err(invalid(
                "execution",
                "slippage_bps",
                "slippage_bps must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    if let Some(value) = number(config, "execution", "commission_per_trade")? {
        if value < 0.0 {
            return Err(invalid(
                "execution",
                "commission_per_trade",
                "commission_per_trade must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_default_cash(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    if let Some(value) = number(config, "ledger", "default_cash")? {
        if value <= 0.0 {
            return Err(invalid(
                "ledger",
                "default_cash",
                "default_cash must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    if let Some(value) = number(config, "ledger", "pool_size")? {
        if value < 1.0 || value.fract() != 0.0 {
            return Err(invalid(
                "ledger",
                "pool_size",
                "pool_size must be a positive integer",
            ));
        }
    }
    Ok(())
}

fn validate_quote_source(config: &dyn ConfigPort) -> Result<(), PaperTradeError> {
    match config.get_string("quotes", "source") {
        None => Ok(()),
        Some(s) if QUOTE_SOURCES.contains(&s.trim().to_lowercase().as_str()) => Ok(()),
        Some(s) => Err(invalid(
            "quotes",
            "source",
            format!("unknown quote source '{s}', expected yahoo or csv"),
        )),
    }
}
