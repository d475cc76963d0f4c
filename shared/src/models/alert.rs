//! Anomaly alerts, baselines, and operational insight aggregates

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::BaseUnit;

/// The anomaly rule that produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RepeatedHighVariance,
    VarianceSpike,
    WorseningTrend,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::RepeatedHighVariance => "repeated_high_variance",
            AlertType::VarianceSpike => "variance_spike",
            AlertType::WorseningTrend => "worsening_trend",
        }
    }
}

impl FromStr for AlertType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repeated_high_variance" => Ok(AlertType::RepeatedHighVariance),
            "variance_spike" => Ok(AlertType::VarianceSpike),
            "worsening_trend" => Ok(AlertType::WorseningTrend),
            _ => Err("Unknown alert type"),
        }
    }
}

/// Alert severity; critical sorts before warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    /// Sort rank: lower sorts first
    pub fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
        }
    }
}

/// Whether the flagged variance runs short or over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceDirection {
    Shortage,
    Overage,
}

impl VarianceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarianceDirection::Shortage => "shortage",
            VarianceDirection::Overage => "overage",
        }
    }
}

/// An anomaly alert, produced fresh on each evaluation (never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub inventory_item_id: Uuid,
    pub item_name: String,
    pub base_unit: BaseUnit,
    pub explanation: String,
    pub suggestion: String,
    /// Timestamp of the most recent stock count behind the alert; drives
    /// recency ordering
    pub observed_at: DateTime<Utc>,
    /// Rule-specific numbers backing the explanation
    pub data: serde_json::Value,
}

/// Rolling operational averages over the trailing window, computed per
/// restaurant (never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    /// Days in the window with at least one paid order
    pub active_days_count: i64,
    /// True when the restaurant has too little history for insights
    pub is_new_restaurant: bool,
    /// Cancellations after payment per active day, proxied by refunds
    pub avg_refunds_per_day: Decimal,
    /// Total discounts over total revenue across paid orders
    pub avg_discount_rate: Decimal,
    /// Items touched by two or more adjustment transactions in a day,
    /// averaged per active day
    pub avg_repeated_adjustment_items_per_day: Decimal,
    /// Average closed shift duration in hours, each shift capped at 24h
    pub avg_shift_hours: Decimal,
    pub avg_paid_orders_per_day: Decimal,
}

/// Baseline-gated anomaly report with the confidence aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub restaurant_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub is_new_restaurant: bool,
    pub baseline: Baseline,
    /// Deterministic weighted penalty score in [40, 100]; not a
    /// statistical confidence interval
    pub confidence_score: i64,
    pub alerts: Vec<Alert>,
}

/// Time bucket granularity for variance trends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGranularity {
    Daily,
    Weekly,
}

/// One time bucket of aggregated stock-count variance for a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub branch_id: Uuid,
    /// First day of the bucket (the day itself, or the ISO week's Monday)
    pub period_start: NaiveDate,
    pub total_variance_base: Decimal,
    pub total_variance_cost: Decimal,
    pub item_count: i64,
}

/// Ranking key for top variance items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceSortBy {
    Quantity,
    Value,
}

/// One item in the top-N variance ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopVarianceItem {
    pub inventory_item_id: Uuid,
    pub branch_id: Uuid,
    pub item_name: String,
    pub base_unit: BaseUnit,
    pub total_variance_base: Decimal,
    pub total_variance_cost: Decimal,
    pub occurrence_count: i64,
}

/// Persisted anti-noise tracker: how many consecutive days an insight
/// type has been surfaced for a restaurant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightEvent {
    pub restaurant_id: Uuid,
    pub insight_type: AlertType,
    pub last_shown_date: NaiveDate,
    pub consecutive_days: i32,
}
