//! Planting plan service: creation, lookup and user-driven status changes

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::plan_locks::PlanLocks;
use super::reconciliation::{CompletionOutcome, ReconciliationEngine};
use crate::error::{field_error, AppError, AppResult};
use crate::store::{HarvestLedger, PlanStore};
use shared::models::{Plan, PlanStatus};
use shared::reconciliation::{production_progress, ProductionProgress};
use shared::types::AreaRef;
use shared::validation::{
    validate_expected_yield, validate_plan_dates, validate_planted_area, validate_precision,
    AREA_INTEGER_DIGITS, YIELD_INTEGER_DIGITS,
};

/// Plan service for managing planting plans
#[derive(Clone)]
pub struct PlanService {
    plans: Arc<dyn PlanStore>,
    ledger: Arc<dyn HarvestLedger>,
    engine: ReconciliationEngine,
    locks: Arc<PlanLocks>,
}

/// Input for creating a plan
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanInput {
    pub property_id: Uuid,
    pub cultivar_id: Uuid,
    /// Exactly one of sector, lot and bed
    pub sector_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    pub planted_area_ha: Option<Decimal>,
    pub expected_yield_per_ha: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl PlanService {
    /// Create a new PlanService instance
    pub fn new(
        plans: Arc<dyn PlanStore>,
        ledger: Arc<dyn HarvestLedger>,
        engine: ReconciliationEngine,
    ) -> Self {
        // Same lock as harvest reconciliation, so a cancel cannot interleave
        // with an auto-completion
        let locks = engine.locks();
        Self {
            plans,
            ledger,
            engine,
            locks,
        }
    }

    /// Create a plan in status `planned`
    pub async fn create_plan(&self, input: CreatePlanInput) -> AppResult<Plan> {
        input.validate()?;

        let area = AreaRef::from_columns(input.sector_id, input.lot_id, input.bed_id)
            .ok_or_else(|| {
                field_error(
                    "area",
                    "Exactly one of sector, lot or bed must be given",
                    "Informe exatamente um setor, lote ou canteiro",
                )
            })?;
        validate_plan_dates(input.start_date, input.expected_end_date).map_err(|msg| {
            field_error(
                "expected_end_date",
                msg,
                "A data prevista de término não pode ser anterior à data de início",
            )
        })?;
        validate_planted_area(input.planted_area_ha).map_err(|msg| {
            field_error("planted_area_ha", msg, "A área plantada deve ser maior que 0")
        })?;
        validate_expected_yield(input.expected_yield_per_ha).map_err(|msg| {
            field_error(
                "expected_yield_per_ha",
                msg,
                "A produtividade esperada não pode ser negativa",
            )
        })?;
        if let Some(area) = input.planted_area_ha {
            validate_precision(area, AREA_INTEGER_DIGITS).map_err(|msg| {
                field_error(
                    "planted_area_ha",
                    msg,
                    "A área plantada aceita até 4 casas decimais e 8 dígitos inteiros",
                )
            })?;
        }
        if let Some(expected_yield) = input.expected_yield_per_ha {
            validate_precision(expected_yield, YIELD_INTEGER_DIGITS).map_err(|msg| {
                field_error(
                    "expected_yield_per_ha",
                    msg,
                    "A produtividade esperada aceita até 4 casas decimais e 10 dígitos inteiros",
                )
            })?;
        }

        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4(),
            property_id: input.property_id,
            cultivar_id: input.cultivar_id,
            area,
            start_date: input.start_date,
            expected_end_date: input.expected_end_date,
            planted_area_ha: input.planted_area_ha,
            expected_yield_per_ha: input.expected_yield_per_ha,
            status: PlanStatus::Planned,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let plan = self.plans.insert_plan(plan).await?;
        tracing::info!(plan_id = %plan.id, property_id = %plan.property_id, "plan created");
        Ok(plan)
    }

    /// Get a plan by ID
    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<Plan> {
        self.plans.get_plan(plan_id).await
    }

    /// Get all plans of a property
    pub async fn list_plans(&self, property_id: Uuid) -> AppResult<Vec<Plan>> {
        self.plans.list_plans(property_id).await
    }

    /// planned -> in_progress
    pub async fn start_plan(&self, plan_id: Uuid) -> AppResult<Plan> {
        self.transition(plan_id, PlanStatus::InProgress).await
    }

    /// planned | in_progress -> cancelled
    pub async fn cancel_plan(&self, plan_id: Uuid) -> AppResult<Plan> {
        self.transition(plan_id, PlanStatus::Cancelled).await
    }

    /// Re-run the completion check, e.g. after a status write failed
    pub async fn complete_plan(&self, plan_id: Uuid) -> AppResult<CompletionOutcome> {
        self.engine.maybe_complete_plan(plan_id).await
    }

    /// Planned-vs-harvested summary of a plan
    pub async fn progress(&self, plan_id: Uuid) -> AppResult<ProductionProgress> {
        let plan = self.plans.get_plan(plan_id).await?;
        let harvests = self.ledger.list_harvests_for_plan(plan_id).await?;
        Ok(production_progress(&plan, &harvests))
    }

    async fn transition(&self, plan_id: Uuid, next: PlanStatus) -> AppResult<Plan> {
        let _guard = self.locks.acquire(plan_id).await;

        let mut plan = self.plans.get_plan(plan_id).await?;
        if !plan.status.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition(format!(
                "{} -> {}",
                plan.status, next
            )));
        }

        self.plans.set_plan_status(plan_id, next).await?;
        tracing::info!(%plan_id, from = %plan.status, to = %next, "plan status changed");

        plan.status = next;
        plan.updated_at = Utc::now();
        Ok(plan)
    }
}
