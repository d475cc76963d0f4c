//! HTTP handlers for consumption computation endpoints

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::consumption::ConsumptionService;
use crate::AppState;

/// Query parameters for a consumption period
#[derive(Debug, Deserialize)]
pub struct ConsumptionQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub branch_id: Option<Uuid>,
}

impl ConsumptionQuery {
    pub fn range(&self) -> shared::types::DateRange {
        shared::types::DateRange::new(self.start, self.end)
    }
}

/// Expected inventory draw-down per item implied by recipes and sales
pub async fn get_theoretical_consumption(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<Json<HashMap<Uuid, Decimal>>> {
    let service = ConsumptionService::new(state.db);
    let consumption = match service
        .get_theoretical_consumption(current_user.0.restaurant_id, query.branch_id, &query.range())
        .await
    {
        Ok(consumption) => consumption,
        Err(e) => {
            // A transient store failure must not break the dashboard
            tracing::error!("theoretical consumption query failed: {}", e);
            HashMap::new()
        }
    };
    Ok(Json(consumption))
}

/// Observed inventory draw-down per item from the transaction ledger
pub async fn get_actual_consumption(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<Json<HashMap<Uuid, Decimal>>> {
    let service = ConsumptionService::new(state.db);
    let consumption = match service
        .get_actual_consumption(current_user.0.restaurant_id, query.branch_id, &query.range())
        .await
    {
        Ok(consumption) => consumption,
        Err(e) => {
            tracing::error!("actual consumption query failed: {}", e);
            HashMap::new()
        }
    };
    Ok(Json(consumption))
}
