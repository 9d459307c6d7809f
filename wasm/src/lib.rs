//! WebAssembly module for the Farm Management Platform
//!
//! Lets the harvest form check a quantity against its plan before
//! submitting, using the same rules the server applies.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::reconciliation::{decide, planned_from, HarvestDecision, PlannedQuantity};
use shared::validation::{
    quantity_from_f64, validate_expected_yield, validate_harvest_quantity as check_positive,
    validate_planted_area, validate_precision, AREA_INTEGER_DIGITS, QUANTITY_INTEGER_DIGITS,
    YIELD_INTEGER_DIGITS,
};

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

fn non_negative(value: f64) -> Result<Decimal, &'static str> {
    let quantity = quantity_from_f64(value)?;
    if quantity < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    Ok(quantity)
}

fn plan_ceiling(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
) -> Result<PlannedQuantity, &'static str> {
    let area = planted_area_ha.map(quantity_from_f64).transpose()?;
    let expected_yield = expected_yield_per_ha.map(quantity_from_f64).transpose()?;
    validate_planted_area(area)?;
    validate_expected_yield(expected_yield)?;
    if let Some(area) = area {
        validate_precision(area, AREA_INTEGER_DIGITS)?;
    }
    if let Some(expected_yield) = expected_yield {
        validate_precision(expected_yield, YIELD_INTEGER_DIGITS)?;
    }
    Ok(planned_from(area, expected_yield))
}

fn reconcile(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
    already_harvested: f64,
    proposed: f64,
) -> Result<HarvestDecision, &'static str> {
    let planned = plan_ceiling(planted_area_ha, expected_yield_per_ha)?;
    let cumulative = non_negative(already_harvested)?;
    let proposed = quantity_from_f64(proposed)?;
    check_positive(proposed)?;
    validate_precision(proposed, QUANTITY_INTEGER_DIGITS)?;
    Ok(decide(planned, cumulative, proposed))
}

/// Planned quantity of a plan, or `undefined` when the plan has no ceiling
#[wasm_bindgen]
pub fn planned_quantity(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
) -> Result<Option<f64>, JsValue> {
    let planned = plan_ceiling(planted_area_ha, expected_yield_per_ha).map_err(js_error)?;
    Ok(planned.ceiling().and_then(|q| q.to_f64()))
}

/// Whether `proposed` fits in the plan given what was already harvested.
/// Invalid input (NaN, infinite, negative, non-positive proposal) is never valid.
#[wasm_bindgen]
pub fn validate_harvest_quantity(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
    already_harvested: f64,
    proposed: f64,
) -> bool {
    reconcile(planted_area_ha, expected_yield_per_ha, already_harvested, proposed)
        .map(|decision| decision.is_accepted())
        .unwrap_or(false)
}

/// Quantity still open on the plan; `undefined` without a ceiling or on invalid input
#[wasm_bindgen]
pub fn remaining_quantity(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
    already_harvested: f64,
) -> Option<f64> {
    let planned = plan_ceiling(planted_area_ha, expected_yield_per_ha).ok()?;
    let cumulative = non_negative(already_harvested).ok()?;
    planned
        .ceiling()
        .map(|q| (q - cumulative).max(Decimal::ZERO))
        .and_then(|q| q.to_f64())
}

/// Full decision as JSON, in the shape the `/harvests/check` endpoint returns
#[wasm_bindgen]
pub fn harvest_decision_json(
    planted_area_ha: Option<f64>,
    expected_yield_per_ha: Option<f64>,
    already_harvested: f64,
    proposed: f64,
) -> Result<String, JsValue> {
    let decision = reconcile(planted_area_ha, expected_yield_per_ha, already_harvested, proposed)
        .map_err(js_error)?;
    serde_json::to_string(&decision).map_err(|e| js_error(&e.to_string()))
}
