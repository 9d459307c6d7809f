//! Reconciliation engine: planned vs. harvested production
//!
//! Loads a plan and its harvests from the stores, applies the rules in
//! `shared::reconciliation`, and writes the resulting plan status. All
//! work on one plan is serialized through [`PlanLocks`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::plan_locks::PlanLocks;
use crate::error::{AppError, AppResult};
use crate::store::{HarvestLedger, PlanStore};
use shared::models::{HarvestRecord, Plan, PlanStatus};
use shared::reconciliation::{completion_transition, validate_new_harvest, HarvestDecision};

#[derive(Clone)]
pub struct ReconciliationEngine {
    plans: Arc<dyn PlanStore>,
    ledger: Arc<dyn HarvestLedger>,
    locks: Arc<PlanLocks>,
}

/// Plan status after a completion check
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub status: PlanStatus,
    /// Whether this call wrote the status
    pub transitioned: bool,
}

/// Result of an accepted harvest submission.
///
/// Recording the harvest and completing the plan are separate steps. The
/// harvest is committed even when `completion` is an error; a later
/// [`ReconciliationEngine::maybe_complete_plan`] call can finish the job.
#[derive(Debug)]
pub struct HarvestSubmission {
    pub harvest: HarvestRecord,
    pub completion: AppResult<CompletionOutcome>,
}

impl ReconciliationEngine {
    pub fn new(plans: Arc<dyn PlanStore>, ledger: Arc<dyn HarvestLedger>) -> Self {
        Self {
            plans,
            ledger,
            locks: Arc::new(PlanLocks::new()),
        }
    }

    /// Lock registry shared with anything else that writes plan status
    pub fn locks(&self) -> Arc<PlanLocks> {
        Arc::clone(&self.locks)
    }

    /// Check a proposed quantity against the plan without recording it.
    ///
    /// Takes no lock: the answer may be stale by the time a submission
    /// arrives, and [`Self::submit_harvest`] checks again.
    pub async fn validate_new_harvest(
        &self,
        plan_id: Uuid,
        proposed: Decimal,
    ) -> AppResult<HarvestDecision> {
        let plan = self.plans.get_plan(plan_id).await?;
        let existing = self.ledger.list_harvests_for_plan(plan_id).await?;
        Ok(validate_new_harvest(&plan, &existing, proposed))
    }

    /// Mark the plan completed if its committed harvests reach the planned
    /// quantity. Safe to call repeatedly.
    pub async fn maybe_complete_plan(&self, plan_id: Uuid) -> AppResult<CompletionOutcome> {
        let _guard = self.locks.acquire(plan_id).await;

        let plan = self.plans.get_plan(plan_id).await?;
        if plan.status == PlanStatus::Completed {
            return Ok(CompletionOutcome {
                status: PlanStatus::Completed,
                transitioned: false,
            });
        }
        let harvests = self.ledger.list_harvests_for_plan(plan_id).await?;
        self.apply_completion(&plan, &harvests).await
    }

    /// Validate, append and then try to complete, all under the plan's lock.
    ///
    /// Returns `AppError::Validation` on the `quantity` field when the
    /// harvest would exceed the plan; no harvest is written in that case.
    /// A rejection against a plan that is already full but still open
    /// retries the completion an earlier submission failed to write.
    pub async fn submit_harvest(&self, record: HarvestRecord) -> AppResult<HarvestSubmission> {
        let plan_id = record.plan_id;
        let _guard = self.locks.acquire(plan_id).await;

        let plan = self.plans.get_plan(plan_id).await?;
        let mut harvests = self.ledger.list_harvests_for_plan(plan_id).await?;

        match validate_new_harvest(&plan, &harvests, record.quantity) {
            HarvestDecision::Rejected {
                planned,
                cumulative,
                proposed,
            } => {
                tracing::debug!(
                    %plan_id,
                    %planned,
                    %cumulative,
                    %proposed,
                    "harvest rejected: would exceed planned quantity"
                );
                if completion_transition(&plan, &harvests).is_some() {
                    if let Err(e) = self.apply_completion(&plan, &harvests).await {
                        tracing::warn!(%plan_id, error = %e, "plan completion retry failed");
                    }
                }
                return Err(AppError::quantity_exceeds_plan());
            }
            HarvestDecision::Accepted { new_total, .. } => {
                tracing::debug!(%plan_id, %new_total, "harvest accepted");
            }
        }

        let harvest = self.ledger.append_harvest(record).await?;
        harvests.push(harvest.clone());

        let completion = self.apply_completion(&plan, &harvests).await;
        if let Err(e) = &completion {
            tracing::warn!(
                %plan_id,
                harvest_id = %harvest.id,
                error = %e,
                "harvest recorded but plan completion failed"
            );
        }

        Ok(HarvestSubmission {
            harvest,
            completion,
        })
    }

    /// Write the completion transition if one is due. Caller holds the lock.
    async fn apply_completion(
        &self,
        plan: &Plan,
        harvests: &[HarvestRecord],
    ) -> AppResult<CompletionOutcome> {
        match completion_transition(plan, harvests) {
            Some(next) => {
                self.plans.set_plan_status(plan.id, next).await?;
                tracing::info!(
                    plan_id = %plan.id,
                    from = %plan.status,
                    to = %next,
                    "plan fulfilled"
                );
                Ok(CompletionOutcome {
                    status: next,
                    transitioned: true,
                })
            }
            None => Ok(CompletionOutcome {
                status: plan.status,
                transitioned: false,
            }),
        }
    }
}
