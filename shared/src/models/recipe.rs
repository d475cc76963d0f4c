//! Recipe models linking menu items to inventory draw-down

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::BaseUnit;

/// A recipe for a menu item at a branch.
///
/// At most one recipe per (branch, menu item) may be active at a time;
/// inactive recipes are retained for audit and excluded from theoretical
/// consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub menu_item_id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ingredient of a recipe, quantity expressed in the inventory
/// item's base unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeLine {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub inventory_item_id: Uuid,
    pub qty_in_base: Decimal,
    pub unit: BaseUnit,
}
