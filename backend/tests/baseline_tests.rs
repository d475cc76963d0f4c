//! Baseline engine tests
//!
//! Covers shift capping, discount rate arithmetic, and the active-day
//! gate at the data level.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::capped_shift_hours;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const MIN_ACTIVE_DAYS: i64 = 3;
const SHIFT_CAP_HOURS: i64 = 24;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two active days in the trailing week gate the insights off
    #[test]
    fn test_active_day_gate() {
        let paid_orders_per_day = [12i64, 0, 0, 9, 0, 0, 0];
        let active_days = paid_orders_per_day.iter().filter(|&&n| n > 0).count() as i64;

        assert_eq!(active_days, 2);
        assert!(active_days < MIN_ACTIVE_DAYS, "too new for insights");
    }

    /// Three active days pass the gate
    #[test]
    fn test_gate_passes_at_three_days() {
        let paid_orders_per_day = [5i64, 5, 0, 5, 0, 0, 0];
        let active_days = paid_orders_per_day.iter().filter(|&&n| n > 0).count() as i64;
        assert!(active_days >= MIN_ACTIVE_DAYS);
    }

    /// Discount rate is total discounts over total revenue
    #[test]
    fn test_discount_rate() {
        let discounts = dec("20") + dec("30");
        let revenue = dec("400") + dec("600");
        assert_eq!(discounts / revenue, dec("0.05"));
    }

    /// An ordinary shift keeps its duration
    #[test]
    fn test_shift_hours_ordinary() {
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let hours = capped_shift_hours(open, open + Duration::hours(8), SHIFT_CAP_HOURS);
        assert_eq!(hours, dec("8"));
    }

    /// A shift left open for days is capped at 24h
    #[test]
    fn test_shift_hours_capped() {
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let hours = capped_shift_hours(open, open + Duration::hours(80), SHIFT_CAP_HOURS);
        assert_eq!(hours, dec("24"));
    }

    /// Averages divide by active days, not the window length
    #[test]
    fn test_per_active_day_average() {
        let total_orders = dec("42");
        let active_days = dec("3");
        assert_eq!(total_orders / active_days, dec("14"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Capped hours never exceed the cap and never go negative
        #[test]
        fn prop_shift_hours_bounded(minutes in 0i64..=(14 * 24 * 60)) {
            let open = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
            let hours = capped_shift_hours(
                open,
                open + Duration::minutes(minutes),
                SHIFT_CAP_HOURS,
            );
            prop_assert!(hours >= Decimal::ZERO);
            prop_assert!(hours <= Decimal::from(SHIFT_CAP_HOURS));
        }

        /// Below the cap the duration is exact
        #[test]
        fn prop_shift_hours_exact_below_cap(minutes in 0i64..=(24 * 60)) {
            let open = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
            let hours = capped_shift_hours(
                open,
                open + Duration::minutes(minutes),
                SHIFT_CAP_HOURS,
            );
            prop_assert_eq!(hours, Decimal::from(minutes) / dec("60"));
        }

        /// The gate is monotone: adding an active day never turns
        /// insights off
        #[test]
        fn prop_gate_monotone(
            days in prop::collection::vec(0i64..=50, 1..14)
        ) {
            let active = days.iter().filter(|&&n| n > 0).count() as i64;
            let gated = active < MIN_ACTIVE_DAYS;

            let mut more = days.clone();
            more.push(1);
            let active_more = more.iter().filter(|&&n| n > 0).count() as i64;
            let gated_more = active_more < MIN_ACTIVE_DAYS;

            if !gated {
                prop_assert!(!gated_more);
            }
        }

        /// Discount rate stays within [0, 1] when discounts never exceed
        /// revenue
        #[test]
        fn prop_discount_rate_bounded(
            revenue in 1i64..=1_000_000i64,
            discount_fraction in 0i64..=100i64
        ) {
            let revenue = Decimal::new(revenue, 2);
            let discounts = revenue * Decimal::new(discount_fraction, 2);
            let rate = discounts / revenue;
            prop_assert!(rate >= Decimal::ZERO);
            prop_assert!(rate <= Decimal::ONE);
        }
    }
}
