//! Trend and summary aggregation over stock-count variance
//!
//! Rolls approved count variances into daily or ISO-week buckets per
//! branch and ranks the top-N items by variance quantity or value.
//! Branches are always reported separately, never summed together.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{TopVarianceItem, TrendGranularity, TrendPoint, VarianceItem, VarianceSortBy};
use shared::types::week_start;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerService, StockVarianceRow};

/// Read-side aggregations feeding the variance dashboard
#[derive(Clone)]
pub struct TrendService {
    ledger: LedgerService,
}

/// One row of the CSV variance report export
#[derive(Debug, Serialize)]
pub struct VarianceReportRow {
    pub item_name: String,
    pub branch_id: Uuid,
    pub base_unit: String,
    pub theoretical_base: Decimal,
    pub actual_base: Decimal,
    pub variance_base: Decimal,
    pub variance_percentage: Decimal,
    pub variance_cost: Decimal,
    pub root_cause: Option<String>,
}

/// Bucket variance rows into time periods per branch
pub fn bucket_trends(rows: &[StockVarianceRow], granularity: TrendGranularity) -> Vec<TrendPoint> {
    let mut buckets: HashMap<(Uuid, NaiveDate), (Decimal, Decimal, HashSet<Uuid>)> =
        HashMap::new();

    for row in rows {
        let day = row.counted_at.date_naive();
        let period_start = match granularity {
            TrendGranularity::Daily => day,
            TrendGranularity::Weekly => week_start(day),
        };
        let entry = buckets
            .entry((row.branch_id, period_start))
            .or_insert_with(|| (Decimal::ZERO, Decimal::ZERO, HashSet::new()));
        entry.0 += row.variance_base;
        entry.1 += row.variance_base * row.avg_cost;
        entry.2.insert(row.inventory_item_id);
    }

    let mut points: Vec<TrendPoint> = buckets
        .into_iter()
        .map(|((branch_id, period_start), (qty, cost, items))| TrendPoint {
            branch_id,
            period_start,
            total_variance_base: qty,
            total_variance_cost: cost,
            item_count: items.len() as i64,
        })
        .collect();

    points.sort_by(|a, b| {
        a.period_start
            .cmp(&b.period_start)
            .then_with(|| a.branch_id.cmp(&b.branch_id))
    });
    points
}

/// Rank items by cumulative variance magnitude or value
pub fn rank_top_items(
    rows: &[StockVarianceRow],
    limit: usize,
    sort_by: VarianceSortBy,
) -> Vec<TopVarianceItem> {
    let mut per_item: HashMap<Uuid, TopVarianceItem> = HashMap::new();

    for row in rows {
        let entry = per_item
            .entry(row.inventory_item_id)
            .or_insert_with(|| TopVarianceItem {
                inventory_item_id: row.inventory_item_id,
                branch_id: row.branch_id,
                item_name: row.item_name.clone(),
                base_unit: row.base_unit.clone(),
                total_variance_base: Decimal::ZERO,
                total_variance_cost: Decimal::ZERO,
                occurrence_count: 0,
            });
        entry.total_variance_base += row.variance_base;
        entry.total_variance_cost += row.variance_base * row.avg_cost;
        entry.occurrence_count += 1;
    }

    let mut ranked: Vec<TopVarianceItem> = per_item.into_values().collect();
    ranked.sort_by(|a, b| {
        let (ka, kb) = match sort_by {
            VarianceSortBy::Quantity => (a.total_variance_base.abs(), b.total_variance_base.abs()),
            VarianceSortBy::Value => (a.total_variance_cost.abs(), b.total_variance_cost.abs()),
        };
        kb.cmp(&ka)
            .then_with(|| a.inventory_item_id.cmp(&b.inventory_item_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Flatten reconciled variance items for CSV export
pub fn variance_report_rows(items: &[VarianceItem]) -> Vec<VarianceReportRow> {
    items
        .iter()
        .map(|item| VarianceReportRow {
            item_name: item.item_name.clone(),
            branch_id: item.branch_id,
            base_unit: item.base_unit.as_str().to_string(),
            theoretical_base: item.theoretical_base,
            actual_base: item.actual_base,
            variance_base: item.variance_base,
            variance_percentage: item.variance_percentage,
            variance_cost: item.variance_cost,
            root_cause: item.tag.as_ref().map(|t| t.root_cause.as_str().to_string()),
        })
        .collect()
}

impl TrendService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db),
        }
    }

    /// Variance rolled into daily or weekly buckets over the last `days`
    pub async fn get_variance_trends(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        granularity: TrendGranularity,
        days: i64,
    ) -> AppResult<Vec<TrendPoint>> {
        let since = Utc::now() - Duration::days(days);
        let rows = self
            .ledger
            .fetch_approved_count_variances(restaurant_id, branch_id, since)
            .await?;

        Ok(bucket_trends(&rows, granularity))
    }

    /// Top-N items by variance quantity or value over the last `days`
    pub async fn get_top_variance_items(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        days: i64,
        limit: usize,
        sort_by: VarianceSortBy,
    ) -> AppResult<Vec<TopVarianceItem>> {
        let since = Utc::now() - Duration::days(days);
        let rows = self
            .ledger
            .fetch_approved_count_variances(restaurant_id, branch_id, since)
            .await?;

        Ok(rank_top_items(&rows, limit, sort_by))
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}
