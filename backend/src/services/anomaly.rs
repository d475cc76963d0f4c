//! Anomaly detection over approved stock-count variances
//!
//! Three independent rules consume the same normalized variance series:
//! repeated high variance, variance spikes between the two latest
//! counts, and worsening week-over-week trends. Each emits zero or more
//! alerts; none mutates the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Alert, AlertSeverity, AlertType, VarianceDirection};
use shared::types::week_start;

use crate::error::AppResult;
use crate::services::ledger::{LedgerService, StockVarianceRow};
use crate::services::thresholds::{
    CRITICAL_INCREASE_PERCENT, CRITICAL_OCCURRENCES, MIN_TREND_WEEKS, MIN_VARIANCE_QTY,
    MIN_WORSENING_TRANSITIONS, NEW_VARIANCE_MULTIPLIER, REPEATED_OCCURRENCES,
    SPIKE_MIN_MULTIPLIER, SPIKE_THRESHOLD_PERCENT, TREND_WEEKS, WORSENING_THRESHOLD_PERCENT,
};

/// Runs the anomaly rules for a restaurant
#[derive(Clone)]
pub struct AnomalyService {
    ledger: LedgerService,
}

fn min_variance() -> Decimal {
    Decimal::from(MIN_VARIANCE_QTY)
}

/// Items repeatedly off by at least the minimum variance across the
/// lookback. Two qualifying counts raise a warning, three make it
/// critical; direction follows the majority sign.
pub fn detect_repeated_high_variance(
    restaurant_id: Uuid,
    rows: &[StockVarianceRow],
) -> Vec<Alert> {
    let min = min_variance();

    let mut per_item: HashMap<Uuid, Vec<&StockVarianceRow>> = HashMap::new();
    for row in rows {
        if row.variance_base.abs() >= min {
            per_item.entry(row.inventory_item_id).or_default().push(row);
        }
    }

    let mut alerts = Vec::new();
    for (item_id, occurrences) in per_item {
        let n = occurrences.len();
        if n < REPEATED_OCCURRENCES {
            continue;
        }

        let severity = if n >= CRITICAL_OCCURRENCES {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        let shortages = occurrences
            .iter()
            .filter(|r| r.variance_base < Decimal::ZERO)
            .count();
        let direction = if shortages * 2 >= n {
            VarianceDirection::Shortage
        } else {
            VarianceDirection::Overage
        };

        let avg_magnitude = (occurrences
            .iter()
            .map(|r| r.variance_base.abs())
            .sum::<Decimal>()
            / Decimal::from(n as i64))
        .round_dp(2);
        let Some(latest) = occurrences.iter().max_by_key(|r| r.counted_at) else {
            continue;
        };

        let explanation = format!(
            "{} shows a {} in {} of the recent stock counts; \
             average variance magnitude is {} {}",
            latest.item_name,
            direction.as_str(),
            n,
            avg_magnitude,
            latest.base_unit,
        );
        let suggestion = match direction {
            VarianceDirection::Shortage => {
                "Review portioning, waste logging, and shrinkage for this item".to_string()
            }
            VarianceDirection::Overage => {
                "Check receiving records and count accuracy for this item".to_string()
            }
        };

        alerts.push(Alert {
            id: Uuid::new_v4(),
            alert_type: AlertType::RepeatedHighVariance,
            severity,
            restaurant_id,
            branch_id: latest.branch_id,
            inventory_item_id: item_id,
            item_name: latest.item_name.clone(),
            base_unit: latest.base_unit.clone(),
            explanation,
            suggestion,
            observed_at: latest.counted_at,
            data: json!({
                "occurrences": n,
                "avg_variance": avg_magnitude,
                "direction": direction.as_str(),
            }),
        });
    }
    alerts
}

/// Sudden jumps between the two most recent approved counts of one
/// branch: a fresh variance at three times the minimum, or a
/// period-over-period increase beyond the spike threshold.
pub fn detect_variance_spike(restaurant_id: Uuid, rows: &[StockVarianceRow]) -> Vec<Alert> {
    let min = min_variance();

    // Distinct counts, most recent first
    let mut counts: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
    for row in rows {
        counts.insert(row.stock_count_id, row.counted_at);
    }
    let mut ordered: Vec<(Uuid, DateTime<Utc>)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let Some(&(latest_id, _)) = ordered.first() else {
        return Vec::new();
    };
    let previous_id = ordered.get(1).map(|&(id, _)| id);

    let previous_magnitude: HashMap<Uuid, Decimal> = rows
        .iter()
        .filter(|r| Some(r.stock_count_id) == previous_id)
        .map(|r| (r.inventory_item_id, r.variance_base.abs()))
        .collect();

    let mut alerts = Vec::new();
    for row in rows.iter().filter(|r| r.stock_count_id == latest_id) {
        let current = row.variance_base.abs();
        let prior = previous_magnitude.get(&row.inventory_item_id).copied();

        match prior {
            Some(prev) if prev > Decimal::ZERO => {
                let increase_pct =
                    ((current - prev) / prev * Decimal::from(100)).round_dp(2);
                if increase_pct < Decimal::from(SPIKE_THRESHOLD_PERCENT)
                    || current < min * Decimal::from(SPIKE_MIN_MULTIPLIER)
                {
                    continue;
                }
                let severity = if increase_pct >= Decimal::from(CRITICAL_INCREASE_PERCENT) {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };
                alerts.push(Alert {
                    id: Uuid::new_v4(),
                    alert_type: AlertType::VarianceSpike,
                    severity,
                    restaurant_id,
                    branch_id: row.branch_id,
                    inventory_item_id: row.inventory_item_id,
                    item_name: row.item_name.clone(),
                    base_unit: row.base_unit.clone(),
                    explanation: format!(
                        "Variance for {} jumped {}% between the last two stock counts \
                         ({} to {} {})",
                        row.item_name, increase_pct, prev, current, row.base_unit,
                    ),
                    suggestion:
                        "Compare the two counts and recent transactions for this item"
                            .to_string(),
                    observed_at: row.counted_at,
                    data: json!({
                        "previous_variance": prev,
                        "current_variance": current,
                        "percentage_change": increase_pct,
                    }),
                });
            }
            _ => {
                // No prior variance: only a markedly large fresh variance
                // is worth surfacing
                if current >= min * Decimal::from(NEW_VARIANCE_MULTIPLIER) {
                    alerts.push(Alert {
                        id: Uuid::new_v4(),
                        alert_type: AlertType::VarianceSpike,
                        severity: AlertSeverity::Warning,
                        restaurant_id,
                        branch_id: row.branch_id,
                        inventory_item_id: row.inventory_item_id,
                        item_name: row.item_name.clone(),
                        base_unit: row.base_unit.clone(),
                        explanation: format!(
                            "{} had no variance in the previous count but now shows {} {}",
                            row.item_name, current, row.base_unit,
                        ),
                        suggestion: "Verify the latest count for this item".to_string(),
                        observed_at: row.counted_at,
                        data: json!({
                            "previous_variance": Decimal::ZERO,
                            "current_variance": current,
                        }),
                    });
                }
            }
        }
    }
    alerts
}

/// Variance magnitudes trending up week over week. Buckets by ISO week
/// (Monday start), keeps the trailing window, and requires repeated
/// worsening transitions before alerting.
pub fn detect_worsening_trend(restaurant_id: Uuid, rows: &[StockVarianceRow]) -> Vec<Alert> {
    let min = min_variance();

    let mut per_item: HashMap<Uuid, Vec<&StockVarianceRow>> = HashMap::new();
    for row in rows {
        if row.variance_base.abs() >= min {
            per_item.entry(row.inventory_item_id).or_default().push(row);
        }
    }

    let mut alerts = Vec::new();
    for (item_id, entries) in per_item {
        let mut weeks: HashMap<chrono::NaiveDate, Vec<Decimal>> = HashMap::new();
        for entry in &entries {
            weeks
                .entry(week_start(entry.counted_at.date_naive()))
                .or_default()
                .push(entry.variance_base.abs());
        }

        let mut ordered: Vec<(chrono::NaiveDate, Vec<Decimal>)> = weeks.into_iter().collect();
        ordered.sort_by_key(|(week, _)| *week);
        if ordered.len() > TREND_WEEKS {
            ordered.drain(..ordered.len() - TREND_WEEKS);
        }
        if ordered.len() < MIN_TREND_WEEKS {
            continue;
        }

        let averages: Vec<Decimal> = ordered
            .iter()
            .map(|(_, magnitudes)| {
                magnitudes.iter().copied().sum::<Decimal>()
                    / Decimal::from(magnitudes.len() as i64)
            })
            .collect();

        let worsening = averages
            .windows(2)
            .filter(|pair| {
                pair[0] > Decimal::ZERO
                    && (pair[1] - pair[0]) / pair[0] * Decimal::from(100)
                        >= Decimal::from(WORSENING_THRESHOLD_PERCENT)
            })
            .count();
        if worsening < MIN_WORSENING_TRANSITIONS {
            continue;
        }

        let first = averages[0];
        let last = averages[averages.len() - 1];
        let total_increase_pct = if first > Decimal::ZERO {
            ((last - first) / first * Decimal::from(100)).round_dp(2)
        } else {
            Decimal::from(CRITICAL_INCREASE_PERCENT)
        };
        let severity = if total_increase_pct >= Decimal::from(CRITICAL_INCREASE_PERCENT) {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        let Some(latest) = entries.iter().max_by_key(|r| r.counted_at) else {
            continue;
        };

        alerts.push(Alert {
            id: Uuid::new_v4(),
            alert_type: AlertType::WorseningTrend,
            severity,
            restaurant_id,
            branch_id: latest.branch_id,
            inventory_item_id: item_id,
            item_name: latest.item_name.clone(),
            base_unit: latest.base_unit.clone(),
            explanation: format!(
                "Weekly variance for {} worsened in {} of the last {} weeks, \
                 from {} to {} {} on average",
                latest.item_name,
                worsening,
                ordered.len(),
                first.round_dp(2),
                last.round_dp(2),
                latest.base_unit,
            ),
            suggestion: "Investigate the growing loss pattern for this item".to_string(),
            observed_at: latest.counted_at,
            data: json!({
                "weeks": ordered.len(),
                "worsening_transitions": worsening,
                "first_week_avg": first.round_dp(2),
                "last_week_avg": last.round_dp(2),
                "total_increase_percent": total_increase_pct,
            }),
        });
    }
    alerts
}

/// Run every rule per branch and order the result for presentation:
/// critical before warning, then most recent first.
pub fn evaluate_alerts(restaurant_id: Uuid, rows: &[StockVarianceRow]) -> Vec<Alert> {
    let mut per_branch: HashMap<Uuid, Vec<StockVarianceRow>> = HashMap::new();
    for row in rows {
        per_branch.entry(row.branch_id).or_default().push(row.clone());
    }

    let mut alerts = Vec::new();
    for branch_rows in per_branch.values() {
        alerts.extend(detect_repeated_high_variance(restaurant_id, branch_rows));
        alerts.extend(detect_variance_spike(restaurant_id, branch_rows));
        alerts.extend(detect_worsening_trend(restaurant_id, branch_rows));
    }

    alerts.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| b.observed_at.cmp(&a.observed_at))
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    alerts
}

impl AnomalyService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db),
        }
    }

    /// Alerts over the approved stock counts of the lookback window
    pub async fn get_inventory_alerts(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        lookback_days: i64,
    ) -> AppResult<Vec<Alert>> {
        let since = Utc::now() - Duration::days(lookback_days);
        let rows = self
            .ledger
            .fetch_approved_count_variances(restaurant_id, branch_id, since)
            .await?;

        Ok(evaluate_alerts(restaurant_id, &rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::types::BaseUnit;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        branch_id: Uuid,
        item_id: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                branch_id: Uuid::new_v4(),
                item_id: Uuid::new_v4(),
            }
        }

        fn row(&self, count_id: Uuid, day: u32, variance: &str) -> StockVarianceRow {
            self.row_for(self.item_id, count_id, day, variance)
        }

        fn row_for(
            &self,
            item_id: Uuid,
            count_id: Uuid,
            day: u32,
            variance: &str,
        ) -> StockVarianceRow {
            StockVarianceRow {
                stock_count_id: count_id,
                branch_id: self.branch_id,
                inventory_item_id: item_id,
                item_name: "Ground beef".to_string(),
                base_unit: BaseUnit::new("g").unwrap(),
                avg_cost: dec("0.05"),
                variance_base: dec(variance),
                counted_at: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(),
            }
        }
    }

    // ========================================================================
    // Repeated High Variance
    // ========================================================================

    #[test]
    fn test_repeated_two_occurrences_is_warning() {
        let f = Fixture::new();
        let restaurant = Uuid::new_v4();
        // three counts; qualifying |variance| >= 1 only in counts 1 and 3
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-2"),
            f.row(Uuid::new_v4(), 8, "0.5"),
            f.row(Uuid::new_v4(), 15, "-2"),
        ];

        let alerts = detect_repeated_high_variance(restaurant, &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::RepeatedHighVariance);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_repeated_three_occurrences_is_critical() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-2"),
            f.row(Uuid::new_v4(), 8, "-3"),
            f.row(Uuid::new_v4(), 15, "-2"),
        ];

        let alerts = detect_repeated_high_variance(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_repeated_single_occurrence_is_silent() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-2"),
            f.row(Uuid::new_v4(), 8, "0.2"),
        ];

        assert!(detect_repeated_high_variance(Uuid::new_v4(), &rows).is_empty());
    }

    #[test]
    fn test_repeated_direction_follows_majority_sign() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "3"),
            f.row(Uuid::new_v4(), 8, "4"),
            f.row(Uuid::new_v4(), 15, "-2"),
        ];

        let alerts = detect_repeated_high_variance(Uuid::new_v4(), &rows);

        assert_eq!(alerts[0].data["direction"], "overage");
    }

    #[test]
    fn test_repeated_explanation_states_count_magnitude_and_unit() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-2"),
            f.row(Uuid::new_v4(), 8, "-4"),
        ];

        let alerts = detect_repeated_high_variance(Uuid::new_v4(), &rows);

        let explanation = &alerts[0].explanation;
        assert!(explanation.contains('2'), "occurrence count: {explanation}");
        assert!(explanation.contains('3'), "avg magnitude: {explanation}");
        assert!(explanation.contains(" g"), "unit: {explanation}");
    }

    // ========================================================================
    // Variance Spike
    // ========================================================================

    #[test]
    fn test_spike_below_threshold_is_silent() {
        let f = Fixture::new();
        // 10 -> 14 is a 40% increase, below the 50% threshold
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-10"),
            f.row(Uuid::new_v4(), 8, "-14"),
        ];

        let alerts = detect_variance_spike(Uuid::new_v4(), &rows);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_spike_at_sixty_percent_fires_warning() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-10"),
            f.row(Uuid::new_v4(), 8, "-16"),
        ];

        let alerts = detect_variance_spike(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].data["percentage_change"], json!(dec("60.00")));
    }

    #[test]
    fn test_spike_doubling_is_critical() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-5"),
            f.row(Uuid::new_v4(), 8, "-11"),
        ];

        let alerts = detect_variance_spike(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_spike_requires_absolute_floor() {
        let f = Fixture::new();
        // 0.5 -> 1.5 triples but stays under 2 x MIN_VARIANCE_QTY
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-0.5"),
            f.row(Uuid::new_v4(), 8, "-1.5"),
        ];

        assert!(detect_variance_spike(Uuid::new_v4(), &rows).is_empty());
    }

    #[test]
    fn test_spike_new_variance_needs_triple_minimum() {
        let f = Fixture::new();
        let other_item = Uuid::new_v4();
        let prev_count = Uuid::new_v4();
        let latest_count = Uuid::new_v4();
        let rows = vec![
            // previous count only saw the other item
            f.row_for(other_item, prev_count, 1, "0.2"),
            // fresh variance at 3x the minimum
            f.row(latest_count, 8, "-3"),
        ];

        let alerts = detect_variance_spike(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].inventory_item_id, f.item_id);
    }

    #[test]
    fn test_spike_only_compares_latest_two_counts() {
        let f = Fixture::new();
        // the oldest count's huge variance is irrelevant; latest two are flat
        let rows = vec![
            f.row(Uuid::new_v4(), 1, "-50"),
            f.row(Uuid::new_v4(), 8, "-10"),
            f.row(Uuid::new_v4(), 15, "-10"),
        ];

        assert!(detect_variance_spike(Uuid::new_v4(), &rows).is_empty());
    }

    // ========================================================================
    // Worsening Trend
    // ========================================================================

    #[test]
    fn test_trend_two_worsening_weeks_fires() {
        let f = Fixture::new();
        // weeks of 2024-06: 3rd (avg 4), 10th (avg 6), 17th (avg 9)
        let rows = vec![
            f.row(Uuid::new_v4(), 3, "-4"),
            f.row(Uuid::new_v4(), 10, "-6"),
            f.row(Uuid::new_v4(), 17, "-9"),
        ];

        let alerts = detect_worsening_trend(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::WorseningTrend);
        // 4 -> 9 is a 125% total increase
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_trend_moderate_increase_is_warning() {
        let f = Fixture::new();
        // 4 -> 5.2 -> 7: +30% and +34.6%, total +75%
        let rows = vec![
            f.row(Uuid::new_v4(), 3, "-4"),
            f.row(Uuid::new_v4(), 10, "-5.2"),
            f.row(Uuid::new_v4(), 17, "-7"),
        ];

        let alerts = detect_worsening_trend(Uuid::new_v4(), &rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_trend_requires_three_weekly_buckets() {
        let f = Fixture::new();
        let rows = vec![
            f.row(Uuid::new_v4(), 3, "-4"),
            f.row(Uuid::new_v4(), 10, "-9"),
        ];

        assert!(detect_worsening_trend(Uuid::new_v4(), &rows).is_empty());
    }

    #[test]
    fn test_trend_single_worsening_transition_is_silent() {
        let f = Fixture::new();
        // only the last transition worsens
        let rows = vec![
            f.row(Uuid::new_v4(), 3, "-4"),
            f.row(Uuid::new_v4(), 10, "-4"),
            f.row(Uuid::new_v4(), 17, "-6"),
        ];

        assert!(detect_worsening_trend(Uuid::new_v4(), &rows).is_empty());
    }

    #[test]
    fn test_trend_ignores_sub_minimum_entries() {
        let f = Fixture::new();
        // sub-minimum noise must not create weekly buckets
        let rows = vec![
            f.row(Uuid::new_v4(), 3, "-0.2"),
            f.row(Uuid::new_v4(), 10, "-0.3"),
            f.row(Uuid::new_v4(), 17, "-0.5"),
        ];

        assert!(detect_worsening_trend(Uuid::new_v4(), &rows).is_empty());
    }

    // ========================================================================
    // Evaluation & ordering
    // ========================================================================

    #[test]
    fn test_evaluate_orders_critical_before_warning() {
        let f = Fixture::new();
        let spiking = Uuid::new_v4();
        let rows = vec![
            // repeated (2 occurrences, warning) on the fixture item
            f.row(Uuid::new_v4(), 1, "-2"),
            f.row(Uuid::new_v4(), 8, "-2"),
            // critical spike on another item in the latest two counts
            f.row_for(spiking, Uuid::new_v4(), 15, "-5"),
            f.row_for(spiking, Uuid::new_v4(), 22, "-12"),
        ];

        let alerts = evaluate_alerts(Uuid::new_v4(), &rows);

        assert!(!alerts.is_empty());
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        let first_warning = alerts
            .iter()
            .position(|a| a.severity == AlertSeverity::Warning);
        let last_critical = alerts
            .iter()
            .rposition(|a| a.severity == AlertSeverity::Critical);
        if let (Some(w), Some(c)) = (first_warning, last_critical) {
            assert!(c < w, "critical alerts must sort before warnings");
        }
    }

    #[test]
    fn test_evaluate_empty_rows_no_alerts() {
        assert!(evaluate_alerts(Uuid::new_v4(), &[]).is_empty());
    }
}
