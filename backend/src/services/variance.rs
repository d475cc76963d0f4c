//! Consumption variance reconciliation and root-cause tagging
//!
//! Joins theoretical against actual consumption per inventory item,
//! values the difference at moving average cost, and merges in any
//! persisted root-cause tag for the period. The tag store is the only
//! write path in the engine.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{variance_percentage, VarianceItem, VarianceTag};
use shared::types::DateRange;
use shared::validation::{validate_root_cause, validate_tag_notes, validate_tag_period};

use crate::error::{AppError, AppResult};
use crate::services::consumption::ConsumptionService;
use crate::services::ledger::{ItemMeta, LedgerService, VarianceTagRow};

/// Variance reconciliation and tag persistence
#[derive(Clone)]
pub struct VarianceService {
    db: PgPool,
    ledger: LedgerService,
}

/// Input for tagging a variance with a root cause
#[derive(Debug, Deserialize)]
pub struct UpsertVarianceTagInput {
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub root_cause: String,
    pub notes: Option<String>,
    pub variance_base: Decimal,
}

/// Join theoretical and actual consumption into the variance report.
///
/// Items with neither theoretical nor actual movement are dropped (no
/// activity, not a zero variance). Output is ordered by absolute
/// financial impact, ties broken by item id for a stable order.
pub fn reconcile(
    theoretical: &HashMap<Uuid, Decimal>,
    actual: &HashMap<Uuid, Decimal>,
    items: &[ItemMeta],
    tags: Vec<VarianceTag>,
) -> Vec<VarianceItem> {
    let meta_by_id: HashMap<Uuid, &ItemMeta> = items.iter().map(|i| (i.id, i)).collect();
    let mut tags_by_item: HashMap<Uuid, VarianceTag> =
        tags.into_iter().map(|t| (t.inventory_item_id, t)).collect();

    let item_ids: BTreeSet<Uuid> = theoretical.keys().chain(actual.keys()).copied().collect();

    let mut out: Vec<VarianceItem> = Vec::with_capacity(item_ids.len());
    for item_id in item_ids {
        let theoretical_base = theoretical.get(&item_id).copied().unwrap_or(Decimal::ZERO);
        let actual_base = actual.get(&item_id).copied().unwrap_or(Decimal::ZERO);
        if theoretical_base.is_zero() && actual_base.is_zero() {
            continue;
        }
        let Some(meta) = meta_by_id.get(&item_id) else {
            continue;
        };

        let variance_base = actual_base - theoretical_base;
        out.push(VarianceItem {
            inventory_item_id: item_id,
            branch_id: meta.branch_id,
            item_name: meta.name.clone(),
            base_unit: meta.base_unit.clone(),
            theoretical_base,
            actual_base,
            variance_base,
            variance_percentage: variance_percentage(theoretical_base, actual_base),
            variance_cost: variance_base * meta.avg_cost,
            tag: tags_by_item.remove(&item_id),
        });
    }

    out.sort_by(|a, b| {
        b.variance_cost
            .abs()
            .cmp(&a.variance_cost.abs())
            .then_with(|| a.inventory_item_id.cmp(&b.inventory_item_id))
    });
    out
}

impl VarianceService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db.clone()),
            db,
        }
    }

    /// Reconciled variance report for the period, highest financial
    /// impact first.
    ///
    /// The theoretical and actual computations have no data dependency
    /// on each other and are evaluated concurrently.
    pub async fn get_consumption_variance(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<Vec<VarianceItem>> {
        let consumption = ConsumptionService::new(self.db.clone());

        let (theoretical, actual) = tokio::join!(
            consumption.get_theoretical_consumption(restaurant_id, branch_id, range),
            consumption.get_actual_consumption(restaurant_id, branch_id, range),
        );
        let theoretical = theoretical?;
        let actual = actual?;

        let item_ids: Vec<Uuid> = theoretical
            .keys()
            .chain(actual.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let (items, tags) = tokio::join!(
            self.ledger.fetch_item_meta(restaurant_id, &item_ids),
            self.ledger.fetch_variance_tags(restaurant_id, branch_id, range),
        );

        Ok(reconcile(&theoretical, &actual, &items?, tags?))
    }

    /// Create or replace the root-cause tag for (branch, item, period).
    ///
    /// The conflict key makes re-tagging idempotent: the latest write
    /// wins, no duplicate rows.
    pub async fn upsert_variance_tag(
        &self,
        restaurant_id: Uuid,
        input: UpsertVarianceTagInput,
    ) -> AppResult<VarianceTag> {
        let root_cause = validate_root_cause(&input.root_cause).map_err(|msg| {
            AppError::Validation {
                field: "root_cause".to_string(),
                message: msg.to_string(),
            }
        })?;
        let period = DateRange::new(input.period_start, input.period_end);
        validate_tag_period(&period).map_err(|msg| AppError::Validation {
            field: "period".to_string(),
            message: msg.to_string(),
        })?;
        validate_tag_notes(input.notes.as_deref()).map_err(|msg| AppError::Validation {
            field: "notes".to_string(),
            message: msg.to_string(),
        })?;

        // The item must belong to this restaurant's branch
        let item_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_items WHERE id = $1 AND restaurant_id = $2 AND branch_id = $3)",
        )
        .bind(input.inventory_item_id)
        .bind(restaurant_id)
        .bind(input.branch_id)
        .fetch_one(&self.db)
        .await?;

        if !item_exists {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }

        let row = sqlx::query_as::<_, VarianceTagRow>(
            r#"
            INSERT INTO variance_tags (
                restaurant_id, branch_id, inventory_item_id,
                period_start, period_end, root_cause, notes, variance_base
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (branch_id, inventory_item_id, period_start, period_end)
            DO UPDATE SET root_cause = EXCLUDED.root_cause,
                          notes = EXCLUDED.notes,
                          variance_base = EXCLUDED.variance_base,
                          updated_at = NOW()
            RETURNING id, restaurant_id, branch_id, inventory_item_id,
                      period_start, period_end, root_cause, notes, variance_base,
                      created_at, updated_at
            "#,
        )
        .bind(restaurant_id)
        .bind(input.branch_id)
        .bind(input.inventory_item_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(root_cause.as_str())
        .bind(&input.notes)
        .bind(input.variance_base)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Hard-delete a variance tag
    pub async fn delete_variance_tag(&self, restaurant_id: Uuid, tag_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM variance_tags WHERE id = $1 AND restaurant_id = $2")
            .bind(tag_id)
            .bind(restaurant_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Variance tag".to_string()));
        }

        Ok(())
    }
}
