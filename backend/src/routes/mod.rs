//! Route definitions for the Restaurant POS Platform

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - consumption engine
        .nest("/inventory", inventory_routes())
        // Protected routes - variance analytics
        .nest("/analytics", analytics_routes())
}

/// Consumption, variance, and alert routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Consumption computation
        .route(
            "/consumption/theoretical",
            get(handlers::get_theoretical_consumption),
        )
        .route(
            "/consumption/actual",
            get(handlers::get_actual_consumption),
        )
        // Variance reconciliation
        .route("/variance", get(handlers::get_consumption_variance))
        .route("/variance/tags", post(handlers::upsert_variance_tag))
        .route(
            "/variance/tags/:tag_id",
            delete(handlers::delete_variance_tag),
        )
        // Anomaly detection
        .route("/alerts", get(handlers::get_inventory_alerts))
        .route("/insights", get(handlers::get_operational_insights))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Trend and summary routes (protected)
fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/variance-trends", get(handlers::get_variance_trends))
        .route(
            "/top-variance-items",
            get(handlers::get_top_variance_items),
        )
        .route(
            "/variance-report/export",
            get(handlers::export_variance_report),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
