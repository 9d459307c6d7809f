//! Harvest management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::harvest::{HarvestService, RecordHarvestInput};
use crate::services::reconciliation::HarvestSubmission;
use crate::AppState;
use shared::models::{HarvestRecord, PlanStatus};

#[derive(Debug, Deserialize)]
pub struct CheckQuantityInput {
    pub quantity: Decimal,
}

/// Response for a recorded harvest.
///
/// The harvest is always committed when this is returned; a failed plan
/// completion shows up in `completion_error` with `plan_status` unset.
#[derive(Debug, Serialize)]
pub struct RecordHarvestResponse {
    pub harvest: HarvestRecord,
    pub plan_status: Option<PlanStatus>,
    pub plan_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<String>,
}

impl From<HarvestSubmission> for RecordHarvestResponse {
    fn from(submission: HarvestSubmission) -> Self {
        match submission.completion {
            Ok(outcome) => Self {
                harvest: submission.harvest,
                plan_status: Some(outcome.status),
                plan_completed: outcome.status == PlanStatus::Completed,
                completion_error: None,
            },
            Err(e) => Self {
                harvest: submission.harvest,
                plan_status: None,
                plan_completed: false,
                completion_error: Some(e.to_string()),
            },
        }
    }
}

fn harvest_service(state: &AppState) -> HarvestService {
    HarvestService::new(state.plans.clone(), state.ledger.clone(), state.engine.clone())
}

/// Record a new harvest
pub async fn record_harvest(
    State(state): State<AppState>,
    Json(input): Json<RecordHarvestInput>,
) -> impl IntoResponse {
    let service = harvest_service(&state);

    match service.record_harvest(input).await {
        Ok(submission) => (
            StatusCode::CREATED,
            Json(RecordHarvestResponse::from(submission)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get harvests for a specific plan
pub async fn list_plan_harvests(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = harvest_service(&state);

    match service.list_for_plan(plan_id).await {
        Ok(harvests) => {
            (StatusCode::OK, Json(serde_json::json!({ "harvests": harvests }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Check a harvest quantity against the plan before submitting the form
pub async fn check_harvest_quantity(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(input): Json<CheckQuantityInput>,
) -> impl IntoResponse {
    let service = harvest_service(&state);

    match service.check_quantity(plan_id, input.quantity).await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(e) => e.into_response(),
    }
}
