//! Planting plan HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::plan::{CreatePlanInput, PlanService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    pub property_id: Uuid,
}

fn plan_service(state: &AppState) -> PlanService {
    PlanService::new(state.plans.clone(), state.ledger.clone(), state.engine.clone())
}

/// List all plans of a property
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.list_plans(query.property_id).await {
        Ok(plans) => (StatusCode::OK, Json(serde_json::json!({ "plans": plans }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new plan
pub async fn create_plan(
    State(state): State<AppState>,
    Json(input): Json<CreatePlanInput>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.create_plan(input).await {
        Ok(plan) => (StatusCode::CREATED, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific plan
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.get_plan(plan_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move a plan from planned to in progress
pub async fn start_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.start_plan(plan_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel an open plan
pub async fn cancel_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.cancel_plan(plan_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Complete a plan whose harvests already reach its planned quantity
pub async fn complete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.complete_plan(plan_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Planned vs. harvested production of a plan
pub async fn get_plan_progress(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = plan_service(&state);

    match service.progress(plan_id).await {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(e) => e.into_response(),
    }
}
