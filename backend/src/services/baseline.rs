//! Rolling operational baseline
//!
//! Computes trailing-window averages (refunds, discount rate, repeated
//! adjustments, shift duration, order volume) that the insight layer
//! compares current behavior against. A restaurant with fewer than the
//! minimum active days is flagged too new; its metrics are still
//! computed but must not drive alerts.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{capped_shift_hours, Baseline};
use shared::types::DateRange;

use crate::error::AppResult;
use crate::services::ledger::{
    AdjustmentDayRow, LedgerService, OrderDayRow, RefundDayRow, ShiftRow,
};
use crate::services::thresholds::SHIFT_CAP_HOURS;

/// Computes the trailing operational baseline for a restaurant
#[derive(Clone)]
pub struct BaselineService {
    ledger: LedgerService,
}

/// Assemble the baseline from per-day ledger rows.
///
/// An active day is a day with at least one paid order; every per-day
/// average divides by the active day count, not the window length.
pub fn build_baseline(
    order_days: &[OrderDayRow],
    refund_days: &[RefundDayRow],
    adjustment_days: &[AdjustmentDayRow],
    shifts: &[ShiftRow],
    min_active_days: i64,
) -> Baseline {
    let active_days_count = order_days.iter().filter(|d| d.paid_orders > 0).count() as i64;
    let active = Decimal::from(active_days_count);

    let total_orders: i64 = order_days.iter().map(|d| d.paid_orders).sum();
    let total_discounts: Decimal = order_days.iter().map(|d| d.discount_total).sum();
    let total_revenue: Decimal = order_days.iter().map(|d| d.revenue_total).sum();
    let total_refunds: i64 = refund_days.iter().map(|d| d.refund_count).sum();

    // Days where an item saw two or more adjustment transactions, counted
    // per item per day
    let mut repeated_by_day: HashMap<NaiveDate, i64> = HashMap::new();
    for row in adjustment_days {
        if row.txn_count >= 2 {
            *repeated_by_day.entry(row.day).or_insert(0) += 1;
        }
    }
    let total_repeated_items: i64 = repeated_by_day.values().sum();

    let per_active_day = |total: Decimal| {
        if active_days_count > 0 {
            total / active
        } else {
            Decimal::ZERO
        }
    };

    let avg_discount_rate = if total_revenue > Decimal::ZERO {
        total_discounts / total_revenue
    } else {
        Decimal::ZERO
    };

    let avg_shift_hours = if shifts.is_empty() {
        Decimal::ZERO
    } else {
        let total_hours: Decimal = shifts
            .iter()
            .map(|s| capped_shift_hours(s.opened_at, s.closed_at, SHIFT_CAP_HOURS))
            .sum();
        total_hours / Decimal::from(shifts.len() as i64)
    };

    Baseline {
        active_days_count,
        is_new_restaurant: active_days_count < min_active_days,
        avg_refunds_per_day: per_active_day(Decimal::from(total_refunds)),
        avg_discount_rate,
        avg_repeated_adjustment_items_per_day: per_active_day(Decimal::from(total_repeated_items)),
        avg_shift_hours,
        avg_paid_orders_per_day: per_active_day(Decimal::from(total_orders)),
    }
}

impl BaselineService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db),
        }
    }

    /// Baseline over the trailing window ending yesterday
    pub async fn compute_baseline(
        &self,
        restaurant_id: Uuid,
        window_days: i64,
        min_active_days: i64,
    ) -> AppResult<Baseline> {
        let today = Utc::now().date_naive();
        let window = DateRange::new(
            today - Duration::days(window_days),
            today - Duration::days(1),
        );

        let (order_days, refund_days, adjustment_days, shifts) = tokio::join!(
            self.ledger.fetch_order_day_rows(restaurant_id, &window),
            self.ledger.fetch_refund_day_rows(restaurant_id, &window),
            self.ledger.fetch_adjustment_day_rows(restaurant_id, &window),
            self.ledger.fetch_closed_shifts(restaurant_id, &window),
        );

        Ok(build_baseline(
            &order_days?,
            &refund_days?,
            &adjustment_days?,
            &shifts?,
            min_active_days,
        ))
    }
}
