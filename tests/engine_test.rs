//! Trading engine against an in-memory SQLite ledger.

mod common;

use approx::assert_relative_eq;
use common::*;
use papertrade::domain::engine::TradingEngine;
use papertrade::domain::error::PaperTradeError;
use papertrade::domain::execution::ExecutionConfig;
use papertrade::domain::position::weighted_average;
use papertrade::domain::trade::Side;
use papertrade::ports::ledger_port::{
    MarkRepository, PositionRepository, TradeRepository,
};

mod accounts {
    use super::*;

    #[test]
    fn ensure_account_uses_default_cash() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());

        let account = engine.ensure_account("core", None).unwrap();
        assert_eq!(account.name, "core");
        assert_relative_eq!(account.cash, 5000.0);
    }

    #[test]
    fn ensure_account_is_idempotent() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());

        let first = engine.ensure_account("core", Some(10_000.0)).unwrap();
        let second = engine.ensure_account("core", Some(1.0)).unwrap();
        assert_eq!(first.id, second.id);
        assert_relative_eq!(second.cash, 10_000.0);
    }

    #[test]
    fn unknown_account_is_not_found() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());

        let err = engine
            .place_market_order("ghost", "AAPL", "BUY", 1.0, None)
            .unwrap_err();
        assert!(matches!(err, PaperTradeError::NotFound { .. }));
        assert!(matches!(
            engine.compute_equity("ghost"),
            Err(PaperTradeError::NotFound { .. })
        ));
    }
}

mod orders {
    use super::*;

    #[test]
    fn buy_scenario_fills_with_slippage_and_commission() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let fixed = clock("2024-06-03");
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default())
            .with_clock(&fixed);
        let account = engine.ensure_account("core", Some(5000.0)).unwrap();

        let trade = engine
            .place_market_order("core", "AAPL", "buy", 10.0, Some("starter"))
            .unwrap();

        assert_eq!(trade.side, Side::Buy);
        assert_relative_eq!(trade.requested_price, 100.0);
        assert_relative_eq!(trade.fill_price, 100.10, epsilon = 1e-9);
        assert_relative_eq!(trade.commission, 0.50);
        assert_relative_eq!(trade.slippage_bps, 10.0);
        assert_eq!(trade.note, "starter");

        let account = engine.account(&account.name).unwrap();
        assert_relative_eq!(account.cash, 3998.50, epsilon = 1e-9);

        let lot = ledger.find_lot(account.id, "AAPL").unwrap().unwrap();
        assert_relative_eq!(lot.quantity, 10.0);
        assert_relative_eq!(lot.avg_cost, 100.10, epsilon = 1e-9);
    }

    #[test]
    fn second_buy_merges_lot_by_weighted_average() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let config = ExecutionConfig {
            slippage_bps: 0.0,
            commission_per_trade: 0.0,
            default_cash: 10_000.0,
        };
        let engine = TradingEngine::new(&ledger, &quotes, config);
        let account = engine.ensure_account("core", None).unwrap();

        engine.place_order("core", "AAPL", Side::Buy, 10.0, None).unwrap();
        quotes.set_price("AAPL", 130.0);
        engine.place_order("core", "AAPL", Side::Buy, 20.0, None).unwrap();

        let lot = ledger.find_lot(account.id, "AAPL").unwrap().unwrap();
        assert_relative_eq!(lot.quantity, 30.0);
        assert_relative_eq!(lot.avg_cost, 120.0, epsilon = 1e-9);
        assert_eq!(ledger.list_lots(account.id).unwrap().len(), 1);
    }

    #[test]
    fn sell_credits_cash_and_keeps_avg_cost() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        let account = engine.ensure_account("core", Some(5000.0)).unwrap();

        engine.place_order("core", "AAPL", Side::Buy, 10.0, None).unwrap();
        quotes.set_price("AAPL", 110.0);
        let trade = engine.place_order("core", "AAPL", Side::Sell, 4.0, None).unwrap();

        // 110 - 0.11 slippage
        assert_relative_eq!(trade.fill_price, 109.89, epsilon = 1e-9);
        let account = engine.account(&account.name).unwrap();
        assert_relative_eq!(account.cash, 3998.50 + 109.89 * 4.0 - 0.50, epsilon = 1e-9);

        let lot = ledger.find_lot(account.id, "AAPL").unwrap().unwrap();
        assert_relative_eq!(lot.quantity, 6.0);
        assert_relative_eq!(lot.avg_cost, 100.10, epsilon = 1e-9);
    }

    #[test]
    fn selling_everything_deletes_the_lot() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        let account = engine.ensure_account("core", None).unwrap();

        engine.place_order("core", "AAPL", Side::Buy, 10.0, None).unwrap();
        engine.place_order("core", "AAPL", Side::Sell, 10.0, None).unwrap();

        assert!(ledger.find_lot(account.id, "AAPL").unwrap().is_none());
        assert_eq!(ledger.recent_trades(account.id, 10).unwrap().len(), 2);
    }

    #[test]
    fn oversell_fails_and_leaves_everything_unchanged() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        let account = engine.ensure_account("core", None).unwrap();
        engine.place_order("core", "AAPL", Side::Buy, 5.0, None).unwrap();
        let cash_before = engine.account("core").unwrap().cash;

        let err = engine
            .place_order("core", "AAPL", Side::Sell, 6.0, None)
            .unwrap_err();
        match err {
            PaperTradeError::InsufficientShares {
                requested, held, ..
            } => {
                assert_relative_eq!(requested, 6.0);
                assert_relative_eq!(held, 5.0);
            }
            other => panic!("expected InsufficientShares, got {other:?}"),
        }

        let lot = ledger.find_lot(account.id, "AAPL").unwrap().unwrap();
        assert_relative_eq!(lot.quantity, 5.0);
        assert_relative_eq!(engine.account("core").unwrap().cash, cash_before);
        assert_eq!(ledger.recent_trades(account.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn selling_unheld_symbol_fails() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("MSFT", 300.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        engine.ensure_account("core", None).unwrap();

        assert!(matches!(
            engine.place_order("core", "MSFT", Side::Sell, 1.0, None),
            Err(PaperTradeError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn buy_beyond_cash_is_rejected_without_writes() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        let account = engine.ensure_account("core", Some(1000.0)).unwrap();

        let err = engine
            .place_order("core", "AAPL", Side::Buy, 10.0, None)
            .unwrap_err();
        assert!(matches!(err, PaperTradeError::InsufficientFunds { .. }));
        assert_relative_eq!(engine.account("core").unwrap().cash, 1000.0);
        assert!(ledger.find_lot(account.id, "AAPL").unwrap().is_none());
        assert!(ledger.recent_trades(account.id, 10).unwrap().is_empty());
    }

    #[test]
    fn invalid_side_is_rejected_before_quoting() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_error("AAPL", "should not be called");
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        engine.ensure_account("core", None).unwrap();

        assert!(matches!(
            engine.place_market_order("core", "AAPL", "HOLD", 1.0, None),
            Err(PaperTradeError::InvalidSide { .. })
        ));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        engine.ensure_account("core", None).unwrap();

        for qty in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                engine.place_order("core", "AAPL", Side::Buy, qty, None),
                Err(PaperTradeError::InvalidQuantity { .. })
            ));
        }
    }

    #[test]
    fn missing_quote_fails_the_order() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        engine.ensure_account("core", None).unwrap();

        assert!(matches!(
            engine.place_order("core", "NOPE", Side::Buy, 1.0, None),
            Err(PaperTradeError::NoPriceData { .. })
        ));
    }
}

mod equity {
    use super::*;

    #[test]
    fn equity_is_cash_plus_marked_positions() {
        let ledger = ledger();
        let quotes = MockQuotePort::new()
            .with_price("AAPL", 100.0)
            .with_price("MSFT", 200.0);
        let config = ExecutionConfig {
            slippage_bps: 0.0,
            commission_per_trade: 0.0,
            default_cash: 5000.0,
        };
        let engine = TradingEngine::new(&ledger, &quotes, config);
        engine.ensure_account("core", None).unwrap();
        engine.place_order("core", "AAPL", Side::Buy, 10.0, None).unwrap();
        engine.place_order("core", "MSFT", Side::Buy, 5.0, None).unwrap();

        quotes.set_price("AAPL", 110.0);
        quotes.set_price("MSFT", 190.0);
        // cash 3000 + 1100 + 950
        assert_relative_eq!(engine.compute_equity("core").unwrap(), 5050.0, epsilon = 1e-9);
    }

    #[test]
    fn any_quote_failure_fails_equity() {
        let ledger = ledger();
        let quotes = MockQuotePort::new().with_price("AAPL", 100.0);
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        engine.ensure_account("core", None).unwrap();
        engine.place_order("core", "AAPL", Side::Buy, 1.0, None).unwrap();

        quotes.prices.borrow_mut().remove("AAPL");
        assert!(matches!(
            engine.compute_equity("core"),
            Err(PaperTradeError::NoPriceData { .. })
        ));
    }

    #[test]
    fn mark_to_market_appends_same_day_duplicates() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let fixed = clock("2024-06-03");
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default())
            .with_clock(&fixed);
        let account = engine.ensure_account("core", None).unwrap();

        let first = engine.mark_to_market("core").unwrap();
        let second = engine.mark_to_market("core").unwrap();

        assert_eq!(first.marked_on, date("2024-06-03"));
        assert_relative_eq!(first.equity, 5000.0);
        assert_relative_eq!(first.cash, 5000.0);
        assert_ne!(first.id, second.id);
        assert_eq!(ledger.daily_marks(account.id).unwrap().len(), 2);
    }
}

mod journal {
    use super::*;
    use papertrade::domain::reports;

    #[test]
    fn journal_entries_are_upper_cased_and_listed_newest_first() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let day_one = clock("2024-06-01");
        let day_two = clock("2024-06-02");
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default())
            .with_clock(&day_one);
        engine.ensure_account("core", None).unwrap();
        engine
            .add_journal("core", "aapl", "thesis", "services growth")
            .unwrap();

        let later = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default())
            .with_clock(&day_two);
        later
            .add_journal("core", "aapl", "exit", "target hit")
            .unwrap();

        let entries = reports::recent_journal(&ledger, "core", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "EXIT");
        assert_eq!(entries[1].symbol, "AAPL");
    }

    #[test]
    fn journal_for_missing_account_fails() {
        let ledger = ledger();
        let quotes = MockQuotePort::new();
        let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig::default());
        assert!(matches!(
            engine.add_journal("ghost", "AAPL", "note", "x"),
            Err(PaperTradeError::NotFound { .. })
        ));
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn weighted_average_merge_stays_between_costs(
            qty1 in 0.001f64..10_000.0,
            cost1 in 0.01f64..5_000.0,
            qty2 in 0.001f64..10_000.0,
            cost2 in 0.01f64..5_000.0,
        ) {
            let (qty, avg) = weighted_average(qty1, cost1, qty2, cost2);
            let expected = (qty1 * cost1 + qty2 * cost2) / (qty1 + qty2);
            let tolerance = 1e-9 * expected.abs().max(1.0);

            prop_assert!((qty - (qty1 + qty2)).abs() < 1e-9);
            prop_assert!((avg - expected).abs() < tolerance);
            prop_assert!(avg >= cost1.min(cost2) - tolerance);
            prop_assert!(avg <= cost1.max(cost2) + tolerance);
        }

        #[test]
        fn buy_cash_follows_fill_formula(
            price in 1.0f64..500.0,
            qty in 1u32..20,
            bps in 0.0f64..50.0,
        ) {
            let ledger = ledger();
            let quotes = MockQuotePort::new().with_price("AAA", price);
            let config = ExecutionConfig {
                slippage_bps: bps,
                commission_per_trade: 0.5,
                default_cash: 100_000.0,
            };
            let engine = TradingEngine::new(&ledger, &quotes, config);
            engine.ensure_account("core", None).unwrap();

            let qty = f64::from(qty);
            let trade = engine.place_order("core", "AAA", Side::Buy, qty, None).unwrap();
            let expected_fill = price + price * bps / 10_000.0;
            prop_assert!((trade.fill_price - expected_fill).abs() < 1e-9);

            let cash = engine.account("core").unwrap().cash;
            prop_assert!((cash - (100_000.0 - expected_fill * qty - 0.5)).abs() < 1e-6);
            prop_assert!(cash >= 0.0);
        }

        #[test]
        fn buy_then_sell_round_trip_costs_slippage_and_two_commissions(
            price in 1.0f64..500.0,
            qty in 1u32..20,
        ) {
            let ledger = ledger();
            let quotes = MockQuotePort::new().with_price("AAA", price);
            let engine = TradingEngine::new(&ledger, &quotes, ExecutionConfig {
                slippage_bps: 10.0,
                commission_per_trade: 0.5,
                default_cash: 100_000.0,
            });
            let account = engine.ensure_account("core", None).unwrap();

            let qty = f64::from(qty);
            engine.place_order("core", "AAA", Side::Buy, qty, None).unwrap();
            engine.place_order("core", "AAA", Side::Sell, qty, None).unwrap();

            let cash = engine.account("core").unwrap().cash;
            let expected = 100_000.0 - 2.0 * price * 0.001 * qty - 1.0;
            prop_assert!((cash - expected).abs() < 1e-6);
            prop_assert!(ledger.find_lot(account.id, "AAA").unwrap().is_none());
        }
    }
}
