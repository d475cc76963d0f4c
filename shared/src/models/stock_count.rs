//! Physical stock count models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Approval status of a stock count. Only approved counts are
/// authoritative and feed the anomaly detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockCountStatus {
    Draft,
    Approved,
}

impl StockCountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockCountStatus::Draft => "draft",
            StockCountStatus::Approved => "approved",
        }
    }
}

impl FromStr for StockCountStatus {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(StockCountStatus::Draft),
            "approved" => Ok(StockCountStatus::Approved),
            _ => Err("Unknown stock count status"),
        }
    }
}

/// A physical count event at a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCount {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub status: StockCountStatus,
    pub counted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// One counted item within a stock count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCountLine {
    pub id: Uuid,
    pub stock_count_id: Uuid,
    pub inventory_item_id: Uuid,
    /// System-computed expected on-hand quantity, in base units
    pub expected_base: Decimal,
    /// Physically counted quantity, in base units
    pub actual_base: Decimal,
}

impl StockCountLine {
    /// Counted minus expected, in base units
    pub fn variance(&self) -> Decimal {
        self.actual_base - self.expected_base
    }
}
