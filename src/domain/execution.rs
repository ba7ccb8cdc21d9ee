//! Market-order fill simulation.
//!
//! Applies basis-point slippage and a flat commission to a quoted price and
//! works out the cash and lot changes an order implies. Nothing here touches
//! the store: the engine hands the resulting [`OrderCommit`] to the ledger,
//! which applies it in one transaction.

use chrono::{DateTime, Utc};

use super::account::Account;
use super::error::PaperTradeError;
use super::position::PositionLot;
use super::trade::{NewTrade, Side};

pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Execution parameters for the trading engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub slippage_bps: f64,
    pub commission_per_trade: f64,
    pub default_cash: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            slippage_bps: 10.0,
            commission_per_trade: 0.50,
            default_cash: 5000.0,
        }
    }
}

/// BUY pays up, SELL receives less: price ± price * bps / 10_000.
pub fn apply_slippage(price: f64, side: Side, slippage_bps: f64) -> f64 {
    let slip = price * (slippage_bps / BPS_PER_UNIT);
    match side {
        Side::Buy => price + slip,
        Side::Sell => price - slip,
    }
}

/// Flat fee, charged on both sides.
pub fn calculate_commission(config: &ExecutionConfig) -> f64 {
    config.commission_per_trade
}

/// How an order changes the account's lot for the traded symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum LotChange {
    Open {
        symbol: String,
        quantity: f64,
        avg_cost: f64,
    },
    Update {
        lot_id: i64,
        quantity: f64,
        avg_cost: f64,
    },
    Close {
        lot_id: i64,
    },
}

/// Everything one order writes: new cash balance, lot change, trade row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCommit {
    pub account_id: i64,
    pub cash_after: f64,
    pub lot_change: LotChange,
    pub trade: NewTrade,
}

/// Inputs to a fill, gathered by the engine before planning.
#[derive(Debug, Clone)]
pub struct OrderRequest<'a> {
    pub account: &'a Account,
    pub lot: Option<&'a PositionLot>,
    pub symbol: &'a str,
    pub side: Side,
    pub quantity: f64,
    pub quote: f64,
    pub note: &'a str,
    pub filled_at: DateTime<Utc>,
}

pub fn validate_quantity(quantity: f64) -> Result<(), PaperTradeError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(PaperTradeError::InvalidQuantity { quantity })
    }
}

pub fn plan_order(
    request: &OrderRequest<'_>,
    config: &ExecutionConfig,
) -> Result<OrderCommit, PaperTradeError> {
    validate_quantity(request.quantity)?;
    match request.side {
        Side::Buy => plan_buy(request, config),
        Side::Sell => plan_sell(request, config),
    }
}

/// Steps:
/// 1. Apply slippage (price increased)
/// 2. total = fill * qty + commission; reject if cash < total
/// 3. Merge into the open lot by weighted average, or open a new one
fn plan_buy(
    request: &OrderRequest<'_>,
    config: &ExecutionConfig,
) -> Result<OrderCommit, PaperTradeError> {
    let fill_price = apply_slippage(request.quote, Side::Buy, config.slippage_bps);
    let commission = calculate_commission(config);
    let total = fill_price * request.quantity + commission;

    if request.account.cash < total {
        return Err(PaperTradeError::InsufficientFunds {
            need: total,
            have: request.account.cash,
        });
    }

    let lot_change = match request.lot {
        Some(lot) => {
            let (quantity, avg_cost) = lot.merged_with(request.quantity, fill_price);
            LotChange::Update {
                lot_id: lot.id,
                quantity,
                avg_cost,
            }
        }
        None => LotChange::Open {
            symbol: request.symbol.to_string(),
            quantity: request.quantity,
            avg_cost: fill_price,
        },
    };

    Ok(OrderCommit {
        account_id: request.account.id,
        cash_after: request.account.cash - total,
        lot_change,
        trade: new_trade(request, fill_price, commission, config),
    })
}

/// Steps:
/// 1. Reject if no lot or held quantity < requested
/// 2. Apply slippage (price decreased)
/// 3. Credit fill * qty - commission
/// 4. Reduce the lot, closing it at exactly zero; avg cost is unchanged
fn plan_sell(
    request: &OrderRequest<'_>,
    config: &ExecutionConfig,
) -> Result<OrderCommit, PaperTradeError> {
    let lot = match request.lot {
        Some(lot) if lot.quantity >= request.quantity => lot,
        other => {
            return Err(PaperTradeError::InsufficientShares {
                symbol: request.symbol.to_string(),
                requested: request.quantity,
                held: other.map(|l| l.quantity).unwrap_or(0.0),
            });
        }
    };

    let fill_price = apply_slippage(request.quote, Side::Sell, config.slippage_bps);
    let commission = calculate_commission(config);
    let proceeds = fill_price * request.quantity - commission;

    let remaining = lot.quantity - request.quantity;
    let lot_change = if remaining == 0.0 {
        LotChange::Close { lot_id: lot.id }
    } else {
        LotChange::Update {
            lot_id: lot.id,
            quantity: remaining,
            avg_cost: lot.avg_cost,
        }
    };

    Ok(OrderCommit {
        account_id: request.account.id,
        cash_after: request.account.cash + proceeds,
        lot_change,
        trade: new_trade(request, fill_price, commission, config),
    })
}

fn new_trade(
    request: &OrderRequest<'_>,
    fill_price: f64,
    commission: f64,
    config: &ExecutionConfig,
) -> NewTrade {
    NewTrade {
        account_id: request.account.id,
        symbol: request.symbol.to_string(),
        side: request.side,
        quantity: request.quantity,
        requested_price: request.quote,
        fill_price,
        commission,
        slippage_bps: config.slippage_bps,
        filled_at: request.filled_at,
        note: request.note.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn account(cash: f64) -> Account {
        Account {
            id: 7,
            name: "core".into(),
            cash,
            created_at: Utc::now(),
        }
    }

    fn lot(quantity: f64, avg_cost: f64) -> PositionLot {
        PositionLot {
            id: 3,
            account_id: 7,
            symbol: "AAPL".into(),
            quantity,
            avg_cost,
            opened_at: Utc::now(),
        }
    }

    fn request<'a>(
        account: &'a Account,
        lot: Option<&'a PositionLot>,
        side: Side,
        quantity: f64,
        quote: f64,
    ) -> OrderRequest<'a> {
        OrderRequest {
            account,
            lot,
            symbol: "AAPL",
            side,
            quantity,
            quote,
            note: "",
            filled_at: Utc::now(),
        }
    }

    #[test]
    fn slippage_buy_pays_up() {
        assert_relative_eq!(apply_slippage(100.0, Side::Buy, 10.0), 100.10, epsilon = 1e-9);
    }

    #[test]
    fn slippage_sell_receives_less() {
        assert_relative_eq!(apply_slippage(100.0, Side::Sell, 10.0), 99.90, epsilon = 1e-9);
    }

    #[test]
    fn slippage_zero_bps_is_identity() {
        assert_relative_eq!(apply_slippage(57.25, Side::Buy, 0.0), 57.25);
        assert_relative_eq!(apply_slippage(57.25, Side::Sell, 0.0), 57.25);
    }

    #[test]
    fn buy_opens_new_lot() {
        let acct = account(5000.0);
        let req = request(&acct, None, Side::Buy, 10.0, 100.0);
        let commit = plan_order(&req, &ExecutionConfig::default()).unwrap();

        assert_relative_eq!(commit.cash_after, 3998.50, epsilon = 1e-9);
        match commit.lot_change {
            LotChange::Open {
                symbol,
                quantity,
                avg_cost,
            } => {
                assert_eq!(symbol, "AAPL");
                assert_relative_eq!(quantity, 10.0);
                assert_relative_eq!(avg_cost, 100.10, epsilon = 1e-9);
            }
            other => panic!("expected Open, got {other:?}"),
        }
        assert_relative_eq!(commit.trade.requested_price, 100.0);
        assert_relative_eq!(commit.trade.fill_price, 100.10, epsilon = 1e-9);
        assert_relative_eq!(commit.trade.commission, 0.50);
        assert_relative_eq!(commit.trade.slippage_bps, 10.0);
    }

    #[test]
    fn buy_merges_existing_lot() {
        let acct = account(5000.0);
        let held = lot(10.0, 100.0);
        let config = ExecutionConfig {
            slippage_bps: 0.0,
            commission_per_trade: 0.0,
            ..Default::default()
        };
        let req = request(&acct, Some(&held), Side::Buy, 10.0, 110.0);
        let commit = plan_order(&req, &config).unwrap();

        match commit.lot_change {
            LotChange::Update {
                lot_id,
                quantity,
                avg_cost,
            } => {
                assert_eq!(lot_id, 3);
                assert_relative_eq!(quantity, 20.0);
                assert_relative_eq!(avg_cost, 105.0, epsilon = 1e-9);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn buy_rejects_insufficient_cash() {
        let acct = account(1000.0);
        let req = request(&acct, None, Side::Buy, 10.0, 100.0);
        match plan_order(&req, &ExecutionConfig::default()) {
            Err(PaperTradeError::InsufficientFunds { need, have }) => {
                assert_relative_eq!(need, 1001.50, epsilon = 1e-9);
                assert_relative_eq!(have, 1000.0);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn buy_allows_spending_exact_cash() {
        let config = ExecutionConfig {
            slippage_bps: 0.0,
            commission_per_trade: 1.0,
            ..Default::default()
        };
        let acct = account(101.0);
        let req = request(&acct, None, Side::Buy, 1.0, 100.0);
        let commit = plan_order(&req, &config).unwrap();
        assert_relative_eq!(commit.cash_after, 0.0);
    }

    #[test]
    fn sell_partial_keeps_avg_cost() {
        let acct = account(0.0);
        let held = lot(10.0, 100.0);
        let req = request(&acct, Some(&held), Side::Sell, 4.0, 120.0);
        let commit = plan_order(&req, &ExecutionConfig::default()).unwrap();

        // fill = 120 - 0.12 = 119.88; proceeds = 479.52 - 0.50
        assert_relative_eq!(commit.cash_after, 479.02, epsilon = 1e-9);
        match commit.lot_change {
            LotChange::Update {
                quantity, avg_cost, ..
            } => {
                assert_relative_eq!(quantity, 6.0);
                assert_relative_eq!(avg_cost, 100.0);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn sell_to_zero_closes_lot() {
        let acct = account(0.0);
        let held = lot(10.0, 100.0);
        let req = request(&acct, Some(&held), Side::Sell, 10.0, 100.0);
        let commit = plan_order(&req, &ExecutionConfig::default()).unwrap();
        assert_eq!(commit.lot_change, LotChange::Close { lot_id: 3 });
    }

    #[test]
    fn sell_more_than_held_fails() {
        let acct = account(0.0);
        let held = lot(5.0, 100.0);
        let req = request(&acct, Some(&held), Side::Sell, 6.0, 100.0);
        match plan_order(&req, &ExecutionConfig::default()) {
            Err(PaperTradeError::InsufficientShares {
                requested, held, ..
            }) => {
                assert_relative_eq!(requested, 6.0);
                assert_relative_eq!(held, 5.0);
            }
            other => panic!("expected InsufficientShares, got {other:?}"),
        }
    }

    #[test]
    fn sell_without_lot_fails() {
        let acct = account(0.0);
        let req = request(&acct, None, Side::Sell, 1.0, 100.0);
        assert!(matches!(
            plan_order(&req, &ExecutionConfig::default()),
            Err(PaperTradeError::InsufficientShares { held, .. }) if held == 0.0
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let acct = account(5000.0);
        for qty in [0.0, -1.0, f64::NAN] {
            let req = request(&acct, None, Side::Buy, qty, 100.0);
            assert!(matches!(
                plan_order(&req, &ExecutionConfig::default()),
                Err(PaperTradeError::InvalidQuantity { .. })
            ));
        }
    }
}
