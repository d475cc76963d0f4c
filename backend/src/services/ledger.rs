//! Ledger read layer for the variance and anomaly engine
//!
//! Every method is a bounded, read-only query scoped to a restaurant
//! (and optionally a branch) over a date range. No business logic lives
//! here; the calculators and detectors consume these rows.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{TransactionType, VarianceTag};
use shared::types::{BaseUnit, DateRange};

use crate::error::{AppError, AppResult};

/// Read-only ledger access for the consumption engine
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Inclusive date range widened to half-open UTC timestamps
pub fn period_bounds(range: &DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&range.start.and_time(NaiveTime::MIN));
    let end_day = range.end.succ_opt().unwrap_or(range.end);
    let end = Utc.from_utc_datetime(&end_day.and_time(NaiveTime::MIN));
    (start, end)
}

/// Paid, non-voided order quantity per (branch, menu item)
#[derive(Debug, Clone, FromRow)]
pub struct OrderedQtyRow {
    pub branch_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: Decimal,
}

/// One line of an active recipe, joined to its branch and menu item
#[derive(Debug, Clone, FromRow)]
pub struct RecipeLineRow {
    pub branch_id: Uuid,
    pub menu_item_id: Uuid,
    pub inventory_item_id: Uuid,
    pub qty_in_base: Decimal,
}

/// A ledger transaction relevant to actual consumption
#[derive(Debug, Clone)]
pub struct ConsumptionTxn {
    pub inventory_item_id: Uuid,
    pub txn_type: TransactionType,
    pub qty_in_base: Decimal,
}

#[derive(Debug, FromRow)]
struct ConsumptionTxnRow {
    inventory_item_id: Uuid,
    txn_type: String,
    qty_in_base: Decimal,
}

/// Item identity, unit, and cost needed to value a variance
#[derive(Debug, Clone)]
pub struct ItemMeta {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub base_unit: BaseUnit,
    pub avg_cost: Decimal,
}

#[derive(Debug, FromRow)]
struct ItemMetaRow {
    id: Uuid,
    branch_id: Uuid,
    name: String,
    base_unit: String,
    avg_cost: Decimal,
}

/// One approved stock-count line variance, joined to its item
#[derive(Debug, Clone)]
pub struct StockVarianceRow {
    pub stock_count_id: Uuid,
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub item_name: String,
    pub base_unit: BaseUnit,
    pub avg_cost: Decimal,
    /// Counted minus expected, in base units
    pub variance_base: Decimal,
    pub counted_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct StockVarianceRawRow {
    stock_count_id: Uuid,
    branch_id: Uuid,
    inventory_item_id: Uuid,
    item_name: String,
    base_unit: String,
    avg_cost: Decimal,
    variance_base: Decimal,
    counted_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct VarianceTagRow {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub root_cause: String,
    pub notes: Option<String>,
    pub variance_base: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VarianceTagRow {
    pub fn into_model(self) -> AppResult<VarianceTag> {
        let root_cause = self
            .root_cause
            .parse()
            .map_err(|_| AppError::Internal(format!("Unknown root cause in store: {}", self.root_cause)))?;
        Ok(VarianceTag {
            id: self.id,
            restaurant_id: self.restaurant_id,
            branch_id: self.branch_id,
            inventory_item_id: self.inventory_item_id,
            period_start: self.period_start,
            period_end: self.period_end,
            root_cause,
            notes: self.notes,
            variance_base: self.variance_base,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Per-day paid order activity for the baseline window
#[derive(Debug, Clone, FromRow)]
pub struct OrderDayRow {
    pub day: NaiveDate,
    pub paid_orders: i64,
    pub discount_total: Decimal,
    pub revenue_total: Decimal,
}

/// Per-day refund count for the baseline window
#[derive(Debug, Clone, FromRow)]
pub struct RefundDayRow {
    pub day: NaiveDate,
    pub refund_count: i64,
}

/// Adjustment transactions per (day, item) for the baseline window
#[derive(Debug, Clone, FromRow)]
pub struct AdjustmentDayRow {
    pub day: NaiveDate,
    pub inventory_item_id: Uuid,
    pub txn_count: i64,
}

/// A closed shift for the baseline window
#[derive(Debug, Clone, FromRow)]
pub struct ShiftRow {
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Quantities of each menu item sold on paid, non-voided order lines
    /// in the period, grouped per branch
    pub async fn fetch_paid_order_quantities(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<Vec<OrderedQtyRow>> {
        let (start, end) = period_bounds(range);

        let rows = sqlx::query_as::<_, OrderedQtyRow>(
            r#"
            SELECT o.branch_id, oi.menu_item_id,
                   COALESCE(SUM(oi.quantity), 0) AS quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.restaurant_id = $1
              AND o.status = 'paid'
              AND oi.voided = false
              AND o.paid_at >= $2 AND o.paid_at < $3
              AND ($4::uuid IS NULL OR o.branch_id = $4)
            GROUP BY o.branch_id, oi.menu_item_id
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Lines of ACTIVE recipes for the given menu items
    pub async fn fetch_active_recipe_lines(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        menu_item_ids: &[Uuid],
    ) -> AppResult<Vec<RecipeLineRow>> {
        let rows = sqlx::query_as::<_, RecipeLineRow>(
            r#"
            SELECT r.branch_id, r.menu_item_id, rl.inventory_item_id, rl.qty_in_base
            FROM recipes r
            JOIN recipe_lines rl ON rl.recipe_id = r.id
            WHERE r.restaurant_id = $1
              AND r.active = true
              AND ($2::uuid IS NULL OR r.branch_id = $2)
              AND r.menu_item_id = ANY($3)
            "#,
        )
        .bind(restaurant_id)
        .bind(branch_id)
        .bind(menu_item_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// All ledger transactions in the period, typed
    pub async fn fetch_consumption_transactions(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<Vec<ConsumptionTxn>> {
        let (start, end) = period_bounds(range);

        let rows = sqlx::query_as::<_, ConsumptionTxnRow>(
            r#"
            SELECT inventory_item_id, txn_type, qty_in_base
            FROM inventory_transactions
            WHERE restaurant_id = $1
              AND created_at >= $2 AND created_at < $3
              AND ($4::uuid IS NULL OR branch_id = $4)
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                let txn_type = r.txn_type.parse::<TransactionType>().map_err(|_| {
                    AppError::Internal(format!("Unknown transaction type in ledger: {}", r.txn_type))
                })?;
                Ok(ConsumptionTxn {
                    inventory_item_id: r.inventory_item_id,
                    txn_type,
                    qty_in_base: r.qty_in_base,
                })
            })
            .collect()
    }

    /// Name, base unit, and moving average cost for a set of items
    pub async fn fetch_item_meta(
        &self,
        restaurant_id: Uuid,
        item_ids: &[Uuid],
    ) -> AppResult<Vec<ItemMeta>> {
        let rows = sqlx::query_as::<_, ItemMetaRow>(
            r#"
            SELECT id, branch_id, name, base_unit, avg_cost
            FROM inventory_items
            WHERE restaurant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(restaurant_id)
        .bind(item_ids)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                let base_unit = BaseUnit::new(&r.base_unit)
                    .map_err(|e| AppError::Internal(format!("Invalid base unit in store: {}", e)))?;
                Ok(ItemMeta {
                    id: r.id,
                    branch_id: r.branch_id,
                    name: r.name,
                    base_unit,
                    avg_cost: r.avg_cost,
                })
            })
            .collect()
    }

    /// Persisted root-cause tags for exactly this annotation period
    pub async fn fetch_variance_tags(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<Vec<VarianceTag>> {
        let rows = sqlx::query_as::<_, VarianceTagRow>(
            r#"
            SELECT id, restaurant_id, branch_id, inventory_item_id,
                   period_start, period_end, root_cause, notes, variance_base,
                   created_at, updated_at
            FROM variance_tags
            WHERE restaurant_id = $1
              AND period_start = $2 AND period_end = $3
              AND ($4::uuid IS NULL OR branch_id = $4)
            "#,
        )
        .bind(restaurant_id)
        .bind(range.start)
        .bind(range.end)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(VarianceTagRow::into_model).collect()
    }

    /// Line variances of APPROVED stock counts since `since`, oldest
    /// first, joined to item identity and cost
    pub async fn fetch_approved_count_variances(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<StockVarianceRow>> {
        let rows = sqlx::query_as::<_, StockVarianceRawRow>(
            r#"
            SELECT sc.id AS stock_count_id, sc.branch_id, scl.inventory_item_id,
                   ii.name AS item_name, ii.base_unit, ii.avg_cost,
                   (scl.actual_base - scl.expected_base) AS variance_base,
                   sc.counted_at
            FROM stock_counts sc
            JOIN stock_count_lines scl ON scl.stock_count_id = sc.id
            JOIN inventory_items ii ON ii.id = scl.inventory_item_id
            WHERE sc.restaurant_id = $1
              AND sc.status = 'approved'
              AND sc.counted_at >= $2
              AND ($3::uuid IS NULL OR sc.branch_id = $3)
            ORDER BY sc.counted_at ASC
            "#,
        )
        .bind(restaurant_id)
        .bind(since)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                let base_unit = BaseUnit::new(&r.base_unit)
                    .map_err(|e| AppError::Internal(format!("Invalid base unit in store: {}", e)))?;
                Ok(StockVarianceRow {
                    stock_count_id: r.stock_count_id,
                    branch_id: r.branch_id,
                    inventory_item_id: r.inventory_item_id,
                    item_name: r.item_name,
                    base_unit,
                    avg_cost: r.avg_cost,
                    variance_base: r.variance_base,
                    counted_at: r.counted_at,
                })
            })
            .collect()
    }

    /// Per-day paid order counts, discounts, and revenue in the window
    pub async fn fetch_order_day_rows(
        &self,
        restaurant_id: Uuid,
        window: &DateRange,
    ) -> AppResult<Vec<OrderDayRow>> {
        let (start, end) = period_bounds(window);

        let rows = sqlx::query_as::<_, OrderDayRow>(
            r#"
            SELECT (paid_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(*) AS paid_orders,
                   COALESCE(SUM(discount_total), 0) AS discount_total,
                   COALESCE(SUM(total), 0) AS revenue_total
            FROM orders
            WHERE restaurant_id = $1
              AND status = 'paid'
              AND paid_at >= $2 AND paid_at < $3
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Per-day count of orders refunded after payment in the window
    pub async fn fetch_refund_day_rows(
        &self,
        restaurant_id: Uuid,
        window: &DateRange,
    ) -> AppResult<Vec<RefundDayRow>> {
        let (start, end) = period_bounds(window);

        let rows = sqlx::query_as::<_, RefundDayRow>(
            r#"
            SELECT (refunded_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(*) AS refund_count
            FROM orders
            WHERE restaurant_id = $1
              AND status = 'refunded'
              AND refunded_at >= $2 AND refunded_at < $3
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Adjustment transaction counts per (day, item) in the window
    pub async fn fetch_adjustment_day_rows(
        &self,
        restaurant_id: Uuid,
        window: &DateRange,
    ) -> AppResult<Vec<AdjustmentDayRow>> {
        let (start, end) = period_bounds(window);

        let rows = sqlx::query_as::<_, AdjustmentDayRow>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   inventory_item_id,
                   COUNT(*) AS txn_count
            FROM inventory_transactions
            WHERE restaurant_id = $1
              AND txn_type IN ('adjustment_in', 'adjustment_out', 'stock_count_adjustment')
              AND created_at >= $2 AND created_at < $3
            GROUP BY 1, 2
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Shifts closed within the window
    pub async fn fetch_closed_shifts(
        &self,
        restaurant_id: Uuid,
        window: &DateRange,
    ) -> AppResult<Vec<ShiftRow>> {
        let (start, end) = period_bounds(window);

        let rows = sqlx::query_as::<_, ShiftRow>(
            r#"
            SELECT opened_at, closed_at
            FROM shifts
            WHERE restaurant_id = $1
              AND closed_at IS NOT NULL
              AND closed_at >= $2 AND closed_at < $3
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
