//! HTTP handlers for anomaly alerts and operational insights

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use rust_decimal::Decimal;
use shared::models::{Alert, Baseline, InsightReport};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::insights::InsightService;
use crate::services::anomaly::AnomalyService;
use crate::AppState;

/// Query parameters for alert evaluation
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub branch_id: Option<Uuid>,
}

/// Current anomaly alerts, critical first, then most recent
pub async fn get_inventory_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<Vec<Alert>>> {
    let service = AnomalyService::new(state.db);
    let alerts = match service
        .get_inventory_alerts(
            current_user.0.restaurant_id,
            query.branch_id,
            state.config.engine.alert_lookback_days,
        )
        .await
    {
        Ok(alerts) => alerts,
        Err(e) => {
            // A transient store failure must not break the dashboard
            tracing::error!("inventory alert evaluation failed: {}", e);
            Vec::new()
        }
    };
    Ok(Json(alerts))
}

/// Baseline-gated insight report with the confidence score
pub async fn get_operational_insights(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<InsightReport>> {
    let service = InsightService::new(state.db);
    let report = match service
        .get_operational_insights(
            current_user.0.restaurant_id,
            query.branch_id,
            &state.config.engine,
        )
        .await
    {
        Ok(report) => report,
        Err(e) => {
            // Degrade to an "insufficient data" report instead of an error
            tracing::error!("operational insight evaluation failed: {}", e);
            InsightReport {
                restaurant_id: current_user.0.restaurant_id,
                branch_id: query.branch_id,
                is_new_restaurant: true,
                baseline: Baseline {
                    active_days_count: 0,
                    is_new_restaurant: true,
                    avg_refunds_per_day: Decimal::ZERO,
                    avg_discount_rate: Decimal::ZERO,
                    avg_repeated_adjustment_items_per_day: Decimal::ZERO,
                    avg_shift_hours: Decimal::ZERO,
                    avg_paid_orders_per_day: Decimal::ZERO,
                },
                confidence_score: 100,
                alerts: Vec::new(),
            }
        }
    };
    Ok(Json(report))
}
