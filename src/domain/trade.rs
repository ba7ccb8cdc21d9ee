//! Executed fills.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::error::PaperTradeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = PaperTradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(PaperTradeError::InvalidSide {
                side: s.to_string(),
            }),
        }
    }
}

/// An append-only record of one executed market order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub requested_price: f64,
    pub fill_price: f64,
    pub commission: f64,
    pub slippage_bps: f64,
    pub filled_at: DateTime<Utc>,
    pub note: String,
}

/// A trade before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub account_id: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub requested_price: f64,
    pub fill_price: f64,
    pub commission: f64,
    pub slippage_bps: f64,
    pub filled_at: DateTime<Utc>,
    pub note: String,
}

impl NewTrade {
    pub fn with_id(self, id: i64) -> Trade {
        Trade {
            id,
            account_id: self.account_id,
            symbol: self.symbol,
            side: self.side,
            quantity: self.quantity,
            requested_price: self.requested_price,
            fill_price: self.fill_price,
            commission: self.commission,
            slippage_bps: self.slippage_bps,
            filled_at: self.filled_at,
            note: self.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" Sell ".parse::<Side>().unwrap(), Side::Sell);
    }

    #[test]
    fn side_rejects_unknown_values() {
        match "short".parse::<Side>() {
            Err(PaperTradeError::InvalidSide { side }) => assert_eq!(side, "short"),
            other => panic!("expected InvalidSide, got {other:?}"),
        }
    }

    #[test]
    fn side_display_round_trips_through_as_str() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.as_str(), "SELL");
    }
}
