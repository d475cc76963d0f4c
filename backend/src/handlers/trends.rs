//! HTTP handlers for variance trend and summary endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{TopVarianceItem, TrendGranularity, TrendPoint, VarianceSortBy};

use crate::error::AppResult;
use crate::handlers::consumption::ConsumptionQuery;
use crate::middleware::CurrentUser;
use crate::services::trends::{variance_report_rows, TrendService};
use crate::services::variance::VarianceService;
use crate::AppState;

fn default_days() -> i64 {
    30
}

fn default_limit() -> usize {
    10
}

fn default_granularity() -> TrendGranularity {
    TrendGranularity::Daily
}

fn default_sort_by() -> VarianceSortBy {
    VarianceSortBy::Value
}

/// Query parameters for variance trends
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default = "default_granularity")]
    pub granularity: TrendGranularity,
    #[serde(default = "default_days")]
    pub days: i64,
    pub branch_id: Option<Uuid>,
}

/// Query parameters for the top variance ranking
#[derive(Debug, Deserialize)]
pub struct TopItemsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_sort_by")]
    pub sort_by: VarianceSortBy,
    pub branch_id: Option<Uuid>,
}

/// Variance rolled into daily or weekly buckets per branch
pub async fn get_variance_trends(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TrendsQuery>,
) -> AppResult<Json<Vec<TrendPoint>>> {
    let service = TrendService::new(state.db);
    let points = match service
        .get_variance_trends(
            current_user.0.restaurant_id,
            query.branch_id,
            query.granularity,
            query.days,
        )
        .await
    {
        Ok(points) => points,
        Err(e) => {
            // A transient store failure must not break the dashboard
            tracing::error!("variance trend query failed: {}", e);
            Vec::new()
        }
    };
    Ok(Json(points))
}

/// Top-N items by variance quantity or value
pub async fn get_top_variance_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TopItemsQuery>,
) -> AppResult<Json<Vec<TopVarianceItem>>> {
    let service = TrendService::new(state.db);
    let items = match service
        .get_top_variance_items(
            current_user.0.restaurant_id,
            query.branch_id,
            query.days,
            query.limit,
            query.sort_by,
        )
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::error!("top variance item query failed: {}", e);
            Vec::new()
        }
    };
    Ok(Json(items))
}

/// Download the reconciled variance report for a period as CSV
pub async fn export_variance_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<Response> {
    let service = VarianceService::new(state.db);
    let items = match service
        .get_consumption_variance(current_user.0.restaurant_id, query.branch_id, &query.range())
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::error!("variance report export failed: {}", e);
            Vec::new()
        }
    };

    let csv = TrendService::export_to_csv(&variance_report_rows(&items))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"variance-report.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
