//! Validation utilities for the Restaurant POS Platform
//!
//! Write-boundary checks for root-cause tags and recipe definitions.

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{InventoryItem, RecipeLine, RootCause};
use crate::types::DateRange;

/// Maximum free-text length for variance tag notes
pub const MAX_TAG_NOTES_LEN: usize = 500;

// ============================================================================
// Variance Tag Validations
// ============================================================================

/// Parse and validate a root cause code at the write boundary
pub fn validate_root_cause(code: &str) -> Result<RootCause, &'static str> {
    code.parse::<RootCause>()
        .map_err(|_| "Root cause must be one of: waste, theft, over_portioning, data_error, supplier_variance, unknown")
}

/// Validate a tag's annotation period: start must not be after end
pub fn validate_tag_period(period: &DateRange) -> Result<(), &'static str> {
    if period.start > period.end {
        return Err("Period start must not be after period end");
    }
    Ok(())
}

/// Validate optional tag notes
pub fn validate_tag_notes(notes: Option<&str>) -> Result<(), &'static str> {
    if let Some(notes) = notes {
        if notes.len() > MAX_TAG_NOTES_LEN {
            return Err("Notes must be at most 500 characters");
        }
    }
    Ok(())
}

// ============================================================================
// Recipe Validations
// ============================================================================

/// Validate recipe lines against their inventory items at save time.
///
/// Every line must reference a known item, carry a positive quantity, and
/// express that quantity in the item's base unit. This is what keeps
/// variance computation single-unit per item.
pub fn validate_recipe_lines(
    lines: &[RecipeLine],
    items: &[InventoryItem],
) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("Recipe must have at least one line");
    }

    let by_id: HashMap<Uuid, &InventoryItem> = items.iter().map(|i| (i.id, i)).collect();

    let mut seen: Vec<Uuid> = Vec::with_capacity(lines.len());
    for line in lines {
        let item = by_id
            .get(&line.inventory_item_id)
            .ok_or("Recipe line references an unknown inventory item")?;

        if line.qty_in_base <= Decimal::ZERO {
            return Err("Recipe line quantity must be positive");
        }
        if line.unit != item.base_unit {
            return Err("Recipe line unit must match the item's base unit");
        }
        if seen.contains(&line.inventory_item_id) {
            return Err("Recipe lists the same inventory item twice");
        }
        seen.push(line.inventory_item_id);
    }

    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate an order quantity (always non-negative)
pub fn validate_quantity(qty: Decimal) -> Result<(), &'static str> {
    if qty < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate a query date range
pub fn validate_date_range(range: &DateRange) -> Result<(), &'static str> {
    if range.start > range.end {
        return Err("Range start must not be after range end");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseUnit;
    use chrono::{NaiveDate, Utc};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(id: Uuid, unit: &str) -> InventoryItem {
        InventoryItem {
            id,
            restaurant_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            name: "Beef".to_string(),
            base_unit: BaseUnit::new(unit).unwrap(),
            avg_cost: dec("0.05"),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn line(item_id: Uuid, qty: &str, unit: &str) -> RecipeLine {
        RecipeLine {
            id: Uuid::new_v4(),
            recipe_id: Uuid::new_v4(),
            inventory_item_id: item_id,
            qty_in_base: dec(qty),
            unit: BaseUnit::new(unit).unwrap(),
        }
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    // ========================================================================
    // Variance Tag Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_root_cause_valid() {
        assert_eq!(validate_root_cause("theft").unwrap(), RootCause::Theft);
        assert_eq!(
            validate_root_cause("over_portioning").unwrap(),
            RootCause::OverPortioning
        );
    }

    #[test]
    fn test_validate_root_cause_invalid() {
        assert!(validate_root_cause("shrinkage").is_err());
        assert!(validate_root_cause("").is_err());
        assert!(validate_root_cause("THEFT").is_err());
    }

    #[test]
    fn test_validate_tag_period() {
        assert!(validate_tag_period(&range((2024, 6, 1), (2024, 6, 30))).is_ok());
        assert!(validate_tag_period(&range((2024, 6, 1), (2024, 6, 1))).is_ok());
        assert!(validate_tag_period(&range((2024, 6, 30), (2024, 6, 1))).is_err());
    }

    #[test]
    fn test_validate_tag_notes() {
        assert!(validate_tag_notes(None).is_ok());
        assert!(validate_tag_notes(Some("spoiled delivery")).is_ok());
        let long = "x".repeat(MAX_TAG_NOTES_LEN + 1);
        assert!(validate_tag_notes(Some(&long)).is_err());
    }

    // ========================================================================
    // Recipe Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_recipe_lines_valid() {
        let beef = item(Uuid::new_v4(), "g");
        let bun = item(Uuid::new_v4(), "unit");
        let lines = vec![line(beef.id, "200", "g"), line(bun.id, "1", "unit")];
        assert!(validate_recipe_lines(&lines, &[beef, bun]).is_ok());
    }

    #[test]
    fn test_validate_recipe_lines_unit_mismatch() {
        let beef = item(Uuid::new_v4(), "g");
        let lines = vec![line(beef.id, "200", "ml")];
        assert_eq!(
            validate_recipe_lines(&lines, &[beef]),
            Err("Recipe line unit must match the item's base unit")
        );
    }

    #[test]
    fn test_validate_recipe_lines_unknown_item() {
        let beef = item(Uuid::new_v4(), "g");
        let lines = vec![line(Uuid::new_v4(), "200", "g")];
        assert!(validate_recipe_lines(&lines, &[beef]).is_err());
    }

    #[test]
    fn test_validate_recipe_lines_non_positive_qty() {
        let beef = item(Uuid::new_v4(), "g");
        assert!(validate_recipe_lines(&[line(beef.id, "0", "g")], std::slice::from_ref(&beef)).is_err());
        assert!(validate_recipe_lines(&[line(beef.id, "-5", "g")], &[beef]).is_err());
    }

    #[test]
    fn test_validate_recipe_lines_duplicate_item() {
        let beef = item(Uuid::new_v4(), "g");
        let lines = vec![line(beef.id, "100", "g"), line(beef.id, "50", "g")];
        assert!(validate_recipe_lines(&lines, &[beef]).is_err());
    }

    #[test]
    fn test_validate_recipe_lines_empty() {
        assert!(validate_recipe_lines(&[], &[]).is_err());
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec("0")).is_ok());
        assert!(validate_quantity(dec("3")).is_ok());
        assert!(validate_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        assert!(validate_date_range(&range((2024, 1, 1), (2024, 12, 31))).is_ok());
        assert!(validate_date_range(&range((2024, 12, 31), (2024, 1, 1))).is_err());
    }
}
