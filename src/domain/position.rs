//! Position lots: one aggregated holding per account and symbol.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionLot {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub opened_at: DateTime<Utc>,
}

impl PositionLot {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.avg_cost) * self.quantity
    }

    /// Quantity and average cost after adding `quantity` shares at `price`.
    pub fn merged_with(&self, quantity: f64, price: f64) -> (f64, f64) {
        weighted_average(self.quantity, self.avg_cost, quantity, price)
    }
}

/// (qty1 + qty2, (qty1*cost1 + qty2*cost2) / (qty1 + qty2))
pub fn weighted_average(qty1: f64, cost1: f64, qty2: f64, cost2: f64) -> (f64, f64) {
    let new_qty = qty1 + qty2;
    let avg = (cost1 * qty1 + cost2 * qty2) / new_qty;
    (new_qty, avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lot() -> PositionLot {
        PositionLot {
            id: 1,
            account_id: 1,
            symbol: "AAPL".into(),
            quantity: 10.0,
            avg_cost: 100.0,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn market_value() {
        let lot = sample_lot();
        assert!((lot.market_value(110.0) - 1100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let lot = sample_lot();
        assert!((lot.unrealized_pnl(105.0) - 50.0).abs() < 1e-9);
        assert!((lot.unrealized_pnl(95.0) - (-50.0)).abs() < 1e-9);
    }

    #[test]
    fn merged_with_weights_by_quantity() {
        let lot = sample_lot();
        let (qty, avg) = lot.merged_with(30.0, 120.0);
        assert!((qty - 40.0).abs() < f64::EPSILON);
        // (10*100 + 30*120) / 40 = 115
        assert!((avg - 115.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_equal_costs_is_unchanged() {
        let (qty, avg) = weighted_average(5.0, 42.0, 7.0, 42.0);
        assert!((qty - 12.0).abs() < f64::EPSILON);
        assert!((avg - 42.0).abs() < 1e-9);
    }
}
