//! Harvest management service for recording and listing harvests

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::reconciliation::{HarvestSubmission, ReconciliationEngine};
use crate::error::{field_error, AppResult};
use crate::store::{HarvestLedger, PlanStore};
use shared::models::{HarvestDestination, HarvestRecord, UnitOfMeasure};
use shared::reconciliation::HarvestDecision;
use shared::types::AreaRef;
use shared::validation::{validate_harvest_quantity, validate_precision, QUANTITY_INTEGER_DIGITS};

/// Harvest service for recording harvests against plans
#[derive(Clone)]
pub struct HarvestService {
    plans: Arc<dyn PlanStore>,
    ledger: Arc<dyn HarvestLedger>,
    engine: ReconciliationEngine,
}

/// Input for recording a harvest
#[derive(Debug, Deserialize, Validate)]
pub struct RecordHarvestInput {
    pub plan_id: Uuid,
    /// Optional: at most one of sector, lot and bed
    pub sector_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub harvest_date: NaiveDate,
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub destination: HarvestDestination,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn check_quantity_input(quantity: Decimal) -> AppResult<()> {
    validate_harvest_quantity(quantity).map_err(|msg| {
        field_error("quantity", msg, "A quantidade colhida deve ser maior que 0")
    })?;
    validate_precision(quantity, QUANTITY_INTEGER_DIGITS).map_err(|msg| {
        field_error(
            "quantity",
            msg,
            "A quantidade colhida aceita até 4 casas decimais e 10 dígitos inteiros",
        )
    })
}

impl HarvestService {
    /// Create a new HarvestService instance
    pub fn new(
        plans: Arc<dyn PlanStore>,
        ledger: Arc<dyn HarvestLedger>,
        engine: ReconciliationEngine,
    ) -> Self {
        Self {
            plans,
            ledger,
            engine,
        }
    }

    /// Record a new harvest and complete its plan when fulfilled
    pub async fn record_harvest(&self, input: RecordHarvestInput) -> AppResult<HarvestSubmission> {
        input.validate()?;
        check_quantity_input(input.quantity)?;

        let area = match (input.sector_id, input.lot_id, input.bed_id) {
            (None, None, None) => None,
            (s, l, b) => Some(AreaRef::from_columns(s, l, b).ok_or_else(|| {
                field_error(
                    "area",
                    "At most one of sector, lot or bed can be given",
                    "Informe no máximo um setor, lote ou canteiro",
                )
            })?),
        };

        let record = HarvestRecord {
            id: Uuid::new_v4(),
            plan_id: input.plan_id,
            area,
            harvest_date: input.harvest_date,
            quantity: input.quantity,
            unit: input.unit,
            destination: input.destination,
            notes: input.notes,
            created_at: Utc::now(),
        };

        let submission = self.engine.submit_harvest(record).await?;
        tracing::info!(
            harvest_id = %submission.harvest.id,
            plan_id = %submission.harvest.plan_id,
            quantity = %submission.harvest.quantity,
            "harvest recorded"
        );
        Ok(submission)
    }

    /// Get harvests of a plan in the order they were recorded
    pub async fn list_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<HarvestRecord>> {
        // 404 for unknown plans instead of an empty list
        self.plans.get_plan(plan_id).await?;
        self.ledger.list_harvests_for_plan(plan_id).await
    }

    /// Check a quantity against the plan without recording anything
    pub async fn check_quantity(
        &self,
        plan_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<HarvestDecision> {
        check_quantity_input(quantity)?;
        self.engine.validate_new_harvest(plan_id, quantity).await
    }
}
