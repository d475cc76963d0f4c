//! Staff shift models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff work shift at a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub branch_id: Uuid,
    pub opened_by: Option<Uuid>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Duration of a closed shift in hours, capped at `cap_hours` to bound
/// the influence of shifts left open by mistake.
pub fn capped_shift_hours(
    opened_at: DateTime<Utc>,
    closed_at: DateTime<Utc>,
    cap_hours: i64,
) -> Decimal {
    let seconds = (closed_at - opened_at).num_seconds().max(0);
    let hours = Decimal::from(seconds) / Decimal::from(3600);
    hours.min(Decimal::from(cap_hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_capped_shift_hours_normal() {
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2024, 6, 1, 17, 30, 0).unwrap();
        assert_eq!(capped_shift_hours(open, close, 24), Decimal::new(85, 1));
    }

    #[test]
    fn test_capped_shift_hours_caps_outliers() {
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        assert_eq!(capped_shift_hours(open, close, 24), Decimal::from(24));
    }

    #[test]
    fn test_capped_shift_hours_negative_clamped() {
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        assert_eq!(capped_shift_hours(open, close, 24), Decimal::ZERO);
    }
}
