//! Environment variable configuration adapter.
//!
//! Exposes the process environment through [`ConfigPort`] by mapping each
//! `[section] key` onto a fixed variable name. Variables are captured once at
//! construction.

use crate::ports::config_port::ConfigPort;
use std::collections::HashMap;

/// `(section, key, variable)` for every setting readable from the environment.
pub const ENV_KEYS: &[(&str, &str, &str)] = &[
    ("ledger", "db_path", "PAPERTRADE_DB"),
    ("ledger", "default_cash", "DEFAULT_CASH"),
    ("execution", "slippage_bps", "SLIPPAGE_BPS"),
    ("execution", "commission_per_trade", "COMMISSION_PER_TRADE"),
    ("quotes", "source", "PAPERTRADE_QUOTES"),
    ("quotes", "csv_dir", "PAPERTRADE_QUOTES_DIR"),
];

pub struct EnvConfigAdapter {
    vars: HashMap<String, String>,
}

impl EnvConfigAdapter {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| ENV_KEYS.iter().any(|(_, _, var)| var == k))
            .collect();
        Self { vars }
    }

    pub fn variable_for(section: &str, key: &str) -> Option<&'static str> {
        ENV_KEYS
            .iter()
            .find(|(s, k, _)| *s == section && *k == key)
            .map(|(_, _, var)| *var)
    }
}

impl ConfigPort for EnvConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        let var = Self::variable_for(section, key)?;
        self.vars
            .get(var)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
