//! Consumption variance output and root-cause tagging

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::BaseUnit;

/// Human-entered classification of an observed variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    Waste,
    Theft,
    OverPortioning,
    DataError,
    SupplierVariance,
    Unknown,
}

impl RootCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootCause::Waste => "waste",
            RootCause::Theft => "theft",
            RootCause::OverPortioning => "over_portioning",
            RootCause::DataError => "data_error",
            RootCause::SupplierVariance => "supplier_variance",
            RootCause::Unknown => "unknown",
        }
    }
}

impl FromStr for RootCause {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waste" => Ok(RootCause::Waste),
            "theft" => Ok(RootCause::Theft),
            "over_portioning" => Ok(RootCause::OverPortioning),
            "data_error" => Ok(RootCause::DataError),
            "supplier_variance" => Ok(RootCause::SupplierVariance),
            "unknown" => Ok(RootCause::Unknown),
            _ => Err("Unknown root cause"),
        }
    }
}

/// A persisted annotation explaining a variance for one item over one
/// period. Unique on (branch, item, period_start, period_end); re-tagging
/// the same period replaces the previous tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceTag {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub root_cause: RootCause,
    pub notes: Option<String>,
    /// The variance quantity this tag annotates, in base units
    pub variance_base: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One reconciled item in the consumption variance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceItem {
    pub inventory_item_id: Uuid,
    pub branch_id: Uuid,
    pub item_name: String,
    pub base_unit: BaseUnit,
    pub theoretical_base: Decimal,
    pub actual_base: Decimal,
    /// Actual minus theoretical, in base units
    pub variance_base: Decimal,
    pub variance_percentage: Decimal,
    /// Variance valued at the item's moving average cost
    pub variance_cost: Decimal,
    pub tag: Option<VarianceTag>,
}

/// Percentage deviation of actual from theoretical consumption.
///
/// When nothing was expected but something was consumed the deviation is
/// reported as a flat 100; when neither moved it is 0 (such items are
/// dropped from variance output anyway).
pub fn variance_percentage(theoretical: Decimal, actual: Decimal) -> Decimal {
    if theoretical > Decimal::ZERO {
        (actual - theoretical) / theoretical * Decimal::from(100)
    } else if actual > Decimal::ZERO {
        Decimal::from(100)
    } else {
        Decimal::ZERO
    }
}
