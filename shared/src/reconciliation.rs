//! Planned-vs-actual production reconciliation
//!
//! Pure functions over a plan and its harvest records. Nothing here reads
//! a store or touches ambient state; the backend engine loads the data and
//! calls into this module.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{HarvestRecord, Plan, PlanStatus};

/// Ceiling on the total quantity a plan may produce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlannedQuantity {
    /// `planted_area_ha * expected_yield_per_ha`; may be zero
    Bounded(Decimal),
    /// Area or expected yield missing: no ceiling
    Unbounded,
}

impl PlannedQuantity {
    pub fn ceiling(&self) -> Option<Decimal> {
        match self {
            PlannedQuantity::Bounded(q) => Some(*q),
            PlannedQuantity::Unbounded => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, PlannedQuantity::Bounded(_))
    }
}

/// Outcome of checking a proposed harvest against its plan.
///
/// Rejection is an ordinary business outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum HarvestDecision {
    Accepted {
        new_total: Decimal,
        planned: PlannedQuantity,
    },
    Rejected {
        planned: Decimal,
        cumulative: Decimal,
        proposed: Decimal,
    },
}

impl HarvestDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, HarvestDecision::Accepted { .. })
    }

    /// Quantity that could still have been accepted, for rejection messages
    pub fn remaining(&self) -> Option<Decimal> {
        match self {
            HarvestDecision::Accepted { new_total, planned } => planned
                .ceiling()
                .map(|q| (q - *new_total).max(Decimal::ZERO)),
            HarvestDecision::Rejected {
                planned,
                cumulative,
                ..
            } => Some((*planned - *cumulative).max(Decimal::ZERO)),
        }
    }
}

/// Compute the planned quantity of a plan
pub fn compute_planned_quantity(plan: &Plan) -> PlannedQuantity {
    planned_from(plan.planted_area_ha, plan.expected_yield_per_ha)
}

/// Planned quantity from planted area and expected yield per hectare
pub fn planned_from(
    planted_area_ha: Option<Decimal>,
    expected_yield_per_ha: Option<Decimal>,
) -> PlannedQuantity {
    match (planted_area_ha, expected_yield_per_ha) {
        // A product beyond the Decimal range is no usable ceiling
        (Some(area), Some(expected_yield)) => area
            .checked_mul(expected_yield)
            .map(PlannedQuantity::Bounded)
            .unwrap_or(PlannedQuantity::Unbounded),
        _ => PlannedQuantity::Unbounded,
    }
}

/// Sum of harvested quantity over the records linked to `plan_id`.
///
/// Decimal addition is exact, so the total does not depend on record order.
/// A total beyond the Decimal range is pinned at `Decimal::MAX`.
pub fn cumulative_harvested(plan_id: Uuid, harvests: &[HarvestRecord]) -> Decimal {
    harvests
        .iter()
        .filter(|h| h.plan_id == plan_id)
        .fold(Decimal::ZERO, |total, h| {
            total.checked_add(h.quantity).unwrap_or(Decimal::MAX)
        })
}

/// Decide whether `proposed` can be added to the plan's harvests.
///
/// The upper bound is inclusive: reaching the planned quantity exactly is
/// accepted. Callers reject non-positive quantities before getting here.
pub fn validate_new_harvest(
    plan: &Plan,
    existing: &[HarvestRecord],
    proposed: Decimal,
) -> HarvestDecision {
    decide(
        compute_planned_quantity(plan),
        cumulative_harvested(plan.id, existing),
        proposed,
    )
}

/// Reconcile a proposed quantity against an already summed total.
///
/// A new total that does not fit in a Decimal is rejected; for plans
/// without a ceiling the reported `planned` is then `Decimal::MAX`.
pub fn decide(planned: PlannedQuantity, cumulative: Decimal, proposed: Decimal) -> HarvestDecision {
    let rejected = |q: Decimal| HarvestDecision::Rejected {
        planned: q,
        cumulative,
        proposed,
    };
    let Some(new_total) = cumulative.checked_add(proposed) else {
        return rejected(planned.ceiling().unwrap_or(Decimal::MAX));
    };

    match planned {
        PlannedQuantity::Unbounded => HarvestDecision::Accepted { new_total, planned },
        PlannedQuantity::Bounded(q) if new_total <= q => {
            HarvestDecision::Accepted { new_total, planned }
        }
        PlannedQuantity::Bounded(q) => rejected(q),
    }
}

/// Status the plan should move to given its committed harvests, if any.
///
/// Only `Completed` is ever returned, and only for bounded plans that are
/// still open. Plans without a ceiling never auto-complete.
pub fn completion_transition(plan: &Plan, harvests: &[HarvestRecord]) -> Option<PlanStatus> {
    let PlannedQuantity::Bounded(q) = compute_planned_quantity(plan) else {
        return None;
    };

    if plan.status.can_transition_to(PlanStatus::Completed)
        && cumulative_harvested(plan.id, harvests) >= q
    {
        Some(PlanStatus::Completed)
    } else {
        None
    }
}

/// Planned-vs-actual summary of one plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionProgress {
    pub plan_id: Uuid,
    pub status: PlanStatus,
    pub planned: PlannedQuantity,
    pub harvested: Decimal,
    pub harvest_count: usize,
    /// Left to harvest; never negative. None without a ceiling.
    pub remaining: Option<Decimal>,
    /// Harvested as a percentage of planned, two decimal places
    pub percent_fulfilled: Option<Decimal>,
    /// Harvested quantity per planted hectare
    pub realized_yield_per_ha: Option<Decimal>,
}

/// Summarize a plan's production so far
pub fn production_progress(plan: &Plan, harvests: &[HarvestRecord]) -> ProductionProgress {
    let planned = compute_planned_quantity(plan);
    let harvested = cumulative_harvested(plan.id, harvests);
    let harvest_count = harvests.iter().filter(|h| h.plan_id == plan.id).count();

    let remaining = planned
        .ceiling()
        .map(|q| (q - harvested).max(Decimal::ZERO));
    let percent_fulfilled = planned
        .ceiling()
        .filter(|q| *q > Decimal::ZERO)
        .and_then(|q| harvested.checked_div(q))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| percent.round_dp(2));
    let realized_yield_per_ha = plan
        .planted_area_ha
        .filter(|area| *area > Decimal::ZERO)
        .and_then(|area| harvested.checked_div(area));

    ProductionProgress {
        plan_id: plan.id,
        status: plan.status,
        planned,
        harvested,
        harvest_count,
        remaining,
        percent_fulfilled,
        realized_yield_per_ha,
    }
}
