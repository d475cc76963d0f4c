//! Inventory items and the transaction ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::BaseUnit;

/// A stocked inventory item, owned by a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub base_unit: BaseUnit,
    /// Moving average cost per base unit, maintained by purchasing
    pub avg_cost: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Types of inventory ledger transactions.
///
/// This enumeration is closed: consumption classification matches on it
/// exhaustively, so a new transaction type fails to compile until it is
/// assigned a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    SaleDeduction,
    Waste,
    AdjustmentOut,
    AdjustmentIn,
    StockCountAdjustment,
    Refund,
    Purchase,
    TransferIn,
    TransferOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::SaleDeduction => "sale_deduction",
            TransactionType::Waste => "waste",
            TransactionType::AdjustmentOut => "adjustment_out",
            TransactionType::AdjustmentIn => "adjustment_in",
            TransactionType::StockCountAdjustment => "stock_count_adjustment",
            TransactionType::Refund => "refund",
            TransactionType::Purchase => "purchase",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
        }
    }

    /// The portion of a transaction quantity that counts as real
    /// consumption, in base units (always non-negative).
    ///
    /// Sale deductions, waste, and manual outward adjustments consume
    /// their full magnitude. Stock count adjustments may carry either
    /// sign; only the negative component is consumption. Everything
    /// else (inflows, refunds, purchases, transfers) consumes nothing.
    pub fn consumed_base(&self, qty_in_base: Decimal) -> Decimal {
        match self {
            TransactionType::SaleDeduction
            | TransactionType::Waste
            | TransactionType::AdjustmentOut => qty_in_base.abs(),
            TransactionType::StockCountAdjustment => {
                if qty_in_base < Decimal::ZERO {
                    qty_in_base.abs()
                } else {
                    Decimal::ZERO
                }
            }
            TransactionType::AdjustmentIn
            | TransactionType::Refund
            | TransactionType::Purchase
            | TransactionType::TransferIn
            | TransactionType::TransferOut => Decimal::ZERO,
        }
    }

    /// Whether this type represents a manual stock adjustment; used by the
    /// baseline engine's repeated-adjustment metric.
    pub fn is_adjustment(&self) -> bool {
        matches!(
            self,
            TransactionType::AdjustmentIn
                | TransactionType::AdjustmentOut
                | TransactionType::StockCountAdjustment
        )
    }
}

impl FromStr for TransactionType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale_deduction" => Ok(TransactionType::SaleDeduction),
            "waste" => Ok(TransactionType::Waste),
            "adjustment_out" => Ok(TransactionType::AdjustmentOut),
            "adjustment_in" => Ok(TransactionType::AdjustmentIn),
            "stock_count_adjustment" => Ok(TransactionType::StockCountAdjustment),
            "refund" => Ok(TransactionType::Refund),
            "purchase" => Ok(TransactionType::Purchase),
            "transfer_in" => Ok(TransactionType::TransferIn),
            "transfer_out" => Ok(TransactionType::TransferOut),
            _ => Err("Unknown transaction type"),
        }
    }
}

/// An immutable inventory ledger entry.
///
/// Sign convention: outflows carry negative `qty_in_base`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub txn_type: TransactionType,
    pub qty_in_base: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
