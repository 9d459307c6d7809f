//! Route definitions for the Farm Management Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Planting plans
        .nest("/plans", plan_routes())
        // Harvest recording
        .nest("/harvests", harvest_routes())
}

/// Plan management routes
fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_plans).post(handlers::create_plan))
        .route("/:plan_id", get(handlers::get_plan))
        .route("/:plan_id/start", post(handlers::start_plan))
        .route("/:plan_id/cancel", post(handlers::cancel_plan))
        .route("/:plan_id/complete", post(handlers::complete_plan))
        .route("/:plan_id/progress", get(handlers::get_plan_progress))
        .route("/:plan_id/harvests", get(handlers::list_plan_harvests))
        .route(
            "/:plan_id/harvests/check",
            post(handlers::check_harvest_quantity),
        )
}

/// Harvest management routes
fn harvest_routes() -> Router<AppState> {
    Router::new().route("/", post(handlers::record_harvest))
}
