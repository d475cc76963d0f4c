//! WebAssembly module for the Restaurant POS Platform
//!
//! Provides client-side computation for:
//! - Variance percentage display
//! - Spike increase calculations
//! - Severity classification
//! - Offline input validation

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

/// Percentage deviation of actual from theoretical consumption
#[wasm_bindgen]
pub fn calculate_variance_percentage(theoretical: f64, actual: f64) -> f64 {
    to_f64(shared::models::variance_percentage(
        to_decimal(theoretical),
        to_decimal(actual),
    ))
}

/// Variance valued at moving average cost
#[wasm_bindgen]
pub fn calculate_variance_cost(variance: f64, avg_cost: f64) -> f64 {
    to_f64(to_decimal(variance) * to_decimal(avg_cost))
}

/// Percentage increase between two variance magnitudes
#[wasm_bindgen]
pub fn calculate_spike_increase(previous: f64, current: f64) -> f64 {
    if previous <= 0.0 {
        return 0.0;
    }
    let prev = to_decimal(previous);
    let curr = to_decimal(current);
    to_f64((curr - prev) / prev * Decimal::from(100))
}

/// Severity label for a period-over-period increase: "critical" at a
/// doubling, "warning" at half again, "none" below
#[wasm_bindgen]
pub fn classify_spike_severity(increase_percent: f64) -> String {
    if increase_percent >= 100.0 {
        "critical".to_string()
    } else if increase_percent >= 50.0 {
        "warning".to_string()
    } else {
        "none".to_string()
    }
}

/// Whether a root cause code will be accepted by the tag write boundary
#[wasm_bindgen]
pub fn is_valid_root_cause(code: &str) -> bool {
    shared::validation::validate_root_cause(code).is_ok()
}

/// Whether a unit code is a valid base unit
#[wasm_bindgen]
pub fn is_valid_base_unit(code: &str) -> bool {
    shared::types::BaseUnit::new(code).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_percentage_matches_engine() {
        assert_eq!(calculate_variance_percentage(2000.0, 1800.0), -10.0);
        assert_eq!(calculate_variance_percentage(0.0, 5.0), 100.0);
    }

    #[test]
    fn test_spike_increase() {
        assert_eq!(calculate_spike_increase(10.0, 16.0), 60.0);
        assert_eq!(calculate_spike_increase(0.0, 16.0), 0.0);
    }

    #[test]
    fn test_spike_severity_labels() {
        assert_eq!(classify_spike_severity(120.0), "critical");
        assert_eq!(classify_spike_severity(60.0), "warning");
        assert_eq!(classify_spike_severity(40.0), "none");
    }

    #[test]
    fn test_root_cause_codes() {
        assert!(is_valid_root_cause("theft"));
        assert!(!is_valid_root_cause("gremlins"));
    }
}
