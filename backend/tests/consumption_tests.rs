//! Consumption computation tests
//!
//! Covers ledger transaction classification and recipe explosion
//! arithmetic at the data level.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::TransactionType;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    const ALL_TYPES: [TransactionType; 9] = [
        TransactionType::SaleDeduction,
        TransactionType::Waste,
        TransactionType::AdjustmentOut,
        TransactionType::AdjustmentIn,
        TransactionType::StockCountAdjustment,
        TransactionType::Refund,
        TransactionType::Purchase,
        TransactionType::TransferIn,
        TransactionType::TransferOut,
    ];

    /// Every transaction type round-trips through its wire code
    #[test]
    fn test_transaction_type_round_trip() {
        for txn_type in ALL_TYPES {
            assert_eq!(
                txn_type.as_str().parse::<TransactionType>().unwrap(),
                txn_type
            );
        }
        assert!("mystery_shrink".parse::<TransactionType>().is_err());
    }

    /// Wire codes are snake_case
    #[test]
    fn test_transaction_type_codes_snake_case() {
        for txn_type in ALL_TYPES {
            assert!(txn_type
                .as_str()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    /// Outflow types consume their full magnitude
    #[test]
    fn test_outflows_consume_full_magnitude() {
        for txn_type in [
            TransactionType::SaleDeduction,
            TransactionType::Waste,
            TransactionType::AdjustmentOut,
        ] {
            assert_eq!(txn_type.consumed_base(dec("-250")), dec("250"));
        }
    }

    /// Stock count adjustments only count their negative side
    #[test]
    fn test_stock_count_adjustment_sign_split() {
        let t = TransactionType::StockCountAdjustment;
        assert_eq!(t.consumed_base(dec("-40")), dec("40"));
        assert_eq!(t.consumed_base(dec("40")), Decimal::ZERO);
        assert_eq!(t.consumed_base(Decimal::ZERO), Decimal::ZERO);
    }

    /// Inflows, refunds, purchases, and transfers never consume
    #[test]
    fn test_non_consuming_types() {
        for txn_type in [
            TransactionType::AdjustmentIn,
            TransactionType::Refund,
            TransactionType::Purchase,
            TransactionType::TransferIn,
            TransactionType::TransferOut,
        ] {
            assert_eq!(txn_type.consumed_base(dec("-100")), Decimal::ZERO);
            assert_eq!(txn_type.consumed_base(dec("100")), Decimal::ZERO);
        }
    }

    /// Only adjustment-family types feed the repeated-adjustment metric
    #[test]
    fn test_adjustment_classification() {
        assert!(TransactionType::AdjustmentIn.is_adjustment());
        assert!(TransactionType::AdjustmentOut.is_adjustment());
        assert!(TransactionType::StockCountAdjustment.is_adjustment());
        assert!(!TransactionType::SaleDeduction.is_adjustment());
        assert!(!TransactionType::Purchase.is_adjustment());
    }

    /// Recipe explosion arithmetic: lines scale linearly with quantity
    #[test]
    fn test_recipe_draw_down_scales_with_orders() {
        let per_unit = dec("200");
        let ordered = dec("10");
        assert_eq!(per_unit * ordered, dec("2000"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for signed base quantities
    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (-100_000i64..=100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn txn_type_strategy() -> impl Strategy<Value = TransactionType> {
        prop_oneof![
            Just(TransactionType::SaleDeduction),
            Just(TransactionType::Waste),
            Just(TransactionType::AdjustmentOut),
            Just(TransactionType::AdjustmentIn),
            Just(TransactionType::StockCountAdjustment),
            Just(TransactionType::Refund),
            Just(TransactionType::Purchase),
            Just(TransactionType::TransferIn),
            Just(TransactionType::TransferOut),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Consumption is never negative, regardless of type or sign
        #[test]
        fn prop_consumed_base_non_negative(
            txn_type in txn_type_strategy(),
            qty in qty_strategy()
        ) {
            prop_assert!(txn_type.consumed_base(qty) >= Decimal::ZERO);
        }

        /// Consumption never exceeds the transaction magnitude
        #[test]
        fn prop_consumed_base_bounded_by_magnitude(
            txn_type in txn_type_strategy(),
            qty in qty_strategy()
        ) {
            prop_assert!(txn_type.consumed_base(qty) <= qty.abs());
        }

        /// Sale deductions consume exactly their magnitude
        #[test]
        fn prop_sale_deduction_full_magnitude(qty in qty_strategy()) {
            prop_assert_eq!(
                TransactionType::SaleDeduction.consumed_base(qty),
                qty.abs()
            );
        }

        /// Positive stock count corrections are never consumption
        #[test]
        fn prop_positive_count_adjustment_ignored(
            qty in (0i64..=100_000i64).prop_map(|n| Decimal::new(n, 2))
        ) {
            prop_assert_eq!(
                TransactionType::StockCountAdjustment.consumed_base(qty),
                Decimal::ZERO
            );
        }

        /// Total draw-down over a ledger is the sum of per-transaction
        /// consumption
        #[test]
        fn prop_consumption_is_additive(
            txns in prop::collection::vec((txn_type_strategy(), qty_strategy()), 1..30)
        ) {
            let total: Decimal = txns
                .iter()
                .map(|(t, q)| t.consumed_base(*q))
                .sum();
            let folded = txns
                .iter()
                .fold(Decimal::ZERO, |acc, (t, q)| acc + t.consumed_base(*q));
            prop_assert_eq!(total, folded);
            prop_assert!(total >= Decimal::ZERO);
        }
    }
}
