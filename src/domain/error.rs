//! Domain error types.

/// Top-level error type for papertrade.
#[derive(Debug, thiserror::Error)]
pub enum PaperTradeError {
    #[error("{entity} '{name}' not found")]
    NotFound { entity: String, name: String },

    #[error("no price data for {symbol}")]
    NoPriceData { symbol: String },

    #[error("insufficient history for {symbol}: have {have} sessions, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("insufficient cash: need {need:.2}, have {have:.2}")]
    InsufficientFunds { need: f64, have: f64 },

    #[error("not enough {symbol} shares to sell: requested {requested}, have {held}")]
    InsufficientShares {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("side must be BUY or SELL, got '{side}'")]
    InvalidSide { side: String },

    #[error("quantity must be a positive number, got {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("benchmark {symbol} not initialized")]
    NotInitialized { symbol: String },

    #[error("series '{series}' has no points")]
    EmptySeries { series: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("quote provider error for {symbol}: {reason}")]
    QuoteProvider { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PaperTradeError {
    pub fn account_not_found(name: &str) -> Self {
        PaperTradeError::NotFound {
            entity: "account".into(),
            name: name.into(),
        }
    }
}

impl From<&PaperTradeError> for std::process::ExitCode {
    fn from(err: &PaperTradeError) -> Self {
        let code: u8 = match err {
            PaperTradeError::Io(_) => 1,
            PaperTradeError::ConfigParse { .. } | PaperTradeError::ConfigInvalid { .. } => 2,
            PaperTradeError::Database { .. } | PaperTradeError::DatabaseQuery { .. } => 3,
            PaperTradeError::NotFound { .. }
            | PaperTradeError::NotInitialized { .. }
            | PaperTradeError::EmptySeries { .. } => 4,
            PaperTradeError::NoPriceData { .. }
            | PaperTradeError::InsufficientHistory { .. }
            | PaperTradeError::QuoteProvider { .. } => 5,
            PaperTradeError::InsufficientFunds { .. }
            | PaperTradeError::InsufficientShares { .. }
            | PaperTradeError::InvalidSide { .. }
            | PaperTradeError::InvalidQuantity { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
