//! Theoretical and actual consumption computation
//!
//! Theoretical consumption explodes paid, non-voided order lines through
//! active recipes into expected inventory draw-down. Actual consumption
//! sums the ledger transactions that represent real draw-down. Both are
//! deterministic over a ledger snapshot and have no side effects.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::types::DateRange;

use crate::error::AppResult;
use crate::services::ledger::{ConsumptionTxn, LedgerService, OrderedQtyRow, RecipeLineRow};

/// Computes expected and observed inventory draw-down per item
#[derive(Clone)]
pub struct ConsumptionService {
    ledger: LedgerService,
}

/// Expected draw-down implied by recipes and sales volume.
///
/// Recipes are matched per (branch, menu item); a sold menu item with no
/// active recipe contributes nothing. That gap is surfaced by the
/// recipe-coverage signal outside this engine, not treated as an error
/// here.
pub fn explode_theoretical(
    ordered: &[OrderedQtyRow],
    lines: &[RecipeLineRow],
) -> HashMap<Uuid, Decimal> {
    let mut lines_by_key: HashMap<(Uuid, Uuid), Vec<&RecipeLineRow>> = HashMap::new();
    for line in lines {
        lines_by_key
            .entry((line.branch_id, line.menu_item_id))
            .or_default()
            .push(line);
    }

    let mut required: HashMap<Uuid, Decimal> = HashMap::new();
    for sold in ordered {
        let Some(recipe_lines) = lines_by_key.get(&(sold.branch_id, sold.menu_item_id)) else {
            continue;
        };
        for line in recipe_lines {
            *required.entry(line.inventory_item_id).or_insert(Decimal::ZERO) +=
                line.qty_in_base * sold.quantity;
        }
    }
    required
}

/// Observed draw-down from the transaction ledger.
///
/// Classification is the exhaustive `TransactionType::consumed_base`
/// match: sale deductions, waste, and outward adjustments in full, plus
/// only the negative portion of stock count adjustments.
pub fn aggregate_actual(txns: &[ConsumptionTxn]) -> HashMap<Uuid, Decimal> {
    let mut consumed: HashMap<Uuid, Decimal> = HashMap::new();
    for txn in txns {
        let qty = txn.txn_type.consumed_base(txn.qty_in_base);
        if qty > Decimal::ZERO {
            *consumed.entry(txn.inventory_item_id).or_insert(Decimal::ZERO) += qty;
        }
    }
    consumed
}

impl ConsumptionService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db),
        }
    }

    /// Expected inventory draw-down per item for the period
    pub async fn get_theoretical_consumption(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<HashMap<Uuid, Decimal>> {
        let ordered = self
            .ledger
            .fetch_paid_order_quantities(restaurant_id, branch_id, range)
            .await?;

        if ordered.is_empty() {
            return Ok(HashMap::new());
        }

        let mut menu_item_ids: Vec<Uuid> = ordered.iter().map(|o| o.menu_item_id).collect();
        menu_item_ids.sort();
        menu_item_ids.dedup();

        let lines = self
            .ledger
            .fetch_active_recipe_lines(restaurant_id, branch_id, &menu_item_ids)
            .await?;

        Ok(explode_theoretical(&ordered, &lines))
    }

    /// Observed inventory draw-down per item for the period
    pub async fn get_actual_consumption(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<HashMap<Uuid, Decimal>> {
        let txns = self
            .ledger
            .fetch_consumption_transactions(restaurant_id, branch_id, range)
            .await?;

        Ok(aggregate_actual(&txns))
    }
}
