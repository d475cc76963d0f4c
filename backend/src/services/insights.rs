//! Operational insights: baseline gating, alert noise tracking, and the
//! confidence aggregate
//!
//! The insight report is what the dashboard renders: the baseline, the
//! active alerts (only when the restaurant has enough history), and a
//! deterministic weighted penalty score. The score is a presentation
//! aggregate, not a statistical confidence interval.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{AlertSeverity, AlertType, InsightReport};

use crate::config::EngineConfig;
use crate::error::AppResult;
use crate::services::anomaly::AnomalyService;
use crate::services::baseline::BaselineService;
use crate::services::thresholds::{CONFIDENCE_FLOOR, CONFIDENCE_START};

/// Produces the baseline-gated insight report
#[derive(Clone)]
pub struct InsightService {
    db: PgPool,
}

/// Points deducted for one active alert. First occurrences (streak of at
/// most one day) cost less than alerts that keep recurring.
pub fn deduction(alert_type: AlertType, severity: AlertSeverity, first_occurrence: bool) -> i64 {
    match (alert_type, severity) {
        (AlertType::RepeatedHighVariance, AlertSeverity::Warning) => {
            if first_occurrence { 6 } else { 12 }
        }
        (AlertType::RepeatedHighVariance, AlertSeverity::Critical) => {
            if first_occurrence { 10 } else { 15 }
        }
        (AlertType::VarianceSpike, AlertSeverity::Warning) => {
            if first_occurrence { 5 } else { 10 }
        }
        (AlertType::VarianceSpike, AlertSeverity::Critical) => {
            if first_occurrence { 9 } else { 14 }
        }
        (AlertType::WorseningTrend, AlertSeverity::Warning) => {
            if first_occurrence { 6 } else { 11 }
        }
        (AlertType::WorseningTrend, AlertSeverity::Critical) => {
            if first_occurrence { 10 } else { 15 }
        }
    }
}

/// Start at 100, deduct per alert, clamp to the floor
pub fn confidence_score(entries: &[(AlertType, AlertSeverity, bool)]) -> i64 {
    let mut score = CONFIDENCE_START;
    for &(alert_type, severity, first) in entries {
        score -= deduction(alert_type, severity, first);
    }
    score.clamp(CONFIDENCE_FLOOR, CONFIDENCE_START)
}

impl InsightService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The full insight report for a restaurant.
    ///
    /// The baseline gate runs first: with fewer than the minimum active
    /// days no anomaly rule is evaluated at all, so a brand new
    /// restaurant never sees spurious alerts.
    pub async fn get_operational_insights(
        &self,
        restaurant_id: Uuid,
        branch_id: Option<Uuid>,
        engine: &EngineConfig,
    ) -> AppResult<InsightReport> {
        let baseline = BaselineService::new(self.db.clone())
            .compute_baseline(
                restaurant_id,
                engine.baseline_window_days,
                engine.min_active_days,
            )
            .await?;

        if baseline.is_new_restaurant {
            return Ok(InsightReport {
                restaurant_id,
                branch_id,
                is_new_restaurant: true,
                baseline,
                confidence_score: CONFIDENCE_START,
                alerts: Vec::new(),
            });
        }

        let alerts = AnomalyService::new(self.db.clone())
            .get_inventory_alerts(restaurant_id, branch_id, engine.alert_lookback_days)
            .await?;

        // Track one streak per alert type; every alert of a type shares
        // its first/repeated standing for today's evaluation
        let today = Utc::now().date_naive();
        let mut alert_types: Vec<AlertType> = alerts.iter().map(|a| a.alert_type).collect();
        alert_types.sort_by_key(|t| t.as_str());
        alert_types.dedup();

        let mut first_by_type: HashMap<AlertType, bool> = HashMap::new();
        for alert_type in alert_types {
            let streak = self
                .record_insight_shown(restaurant_id, alert_type, today)
                .await?;
            first_by_type.insert(alert_type, streak <= 1);
        }

        let entries: Vec<(AlertType, AlertSeverity, bool)> = alerts
            .iter()
            .map(|a| {
                (
                    a.alert_type,
                    a.severity,
                    first_by_type.get(&a.alert_type).copied().unwrap_or(true),
                )
            })
            .collect();

        Ok(InsightReport {
            restaurant_id,
            branch_id,
            is_new_restaurant: false,
            baseline,
            confidence_score: confidence_score(&entries),
            alerts,
        })
    }

    /// Atomically advance the shown-streak for an insight type.
    ///
    /// Same-day re-evaluations keep the streak unchanged, a consecutive
    /// calendar day advances it, and any gap resets it to one. Returns
    /// the streak after the update.
    async fn record_insight_shown(
        &self,
        restaurant_id: Uuid,
        insight_type: AlertType,
        today: NaiveDate,
    ) -> AppResult<i32> {
        let consecutive_days = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO insight_events (restaurant_id, insight_type, last_shown_date, consecutive_days)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (restaurant_id, insight_type)
            DO UPDATE SET
                consecutive_days = CASE
                    WHEN insight_events.last_shown_date = EXCLUDED.last_shown_date
                        THEN insight_events.consecutive_days
                    WHEN insight_events.last_shown_date = EXCLUDED.last_shown_date - 1
                        THEN insight_events.consecutive_days + 1
                    ELSE 1
                END,
                last_shown_date = EXCLUDED.last_shown_date
            RETURNING consecutive_days
            "#,
        )
        .bind(restaurant_id)
        .bind(insight_type.as_str())
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        Ok(consecutive_days)
    }
}
