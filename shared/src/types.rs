//! Common types used across the platform

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Canonical unit of measure for an inventory item (e.g., "g", "ml", "unit").
///
/// Recipe lines and inventory items must agree on this unit; the check is
/// performed at recipe-save time so variance computation never compares
/// quantities across units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseUnit(String);

impl BaseUnit {
    /// Normalize and validate a unit code: trimmed, lowercase, 1-16
    /// alphanumeric ASCII characters.
    pub fn new(code: &str) -> Result<Self, &'static str> {
        let normalized = code.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err("Base unit cannot be empty");
        }
        if normalized.len() > 16 {
            return Err("Base unit must be at most 16 characters");
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("Base unit must be alphanumeric");
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Date range for queries, inclusive on both ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered by the range
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Monday of the ISO week containing `date`.
///
/// Both the worsening-trend detector and the weekly trend aggregator
/// bucket by this value so week boundaries always agree.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
