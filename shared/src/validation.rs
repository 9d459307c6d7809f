//! Validation utilities for the Farm Management Platform
//!
//! Input checks applied before data reaches reconciliation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Decimal places every stored quantity, area and yield is kept at
pub const MAX_DECIMAL_PLACES: u32 = 4;

/// Integer digits of a harvested quantity (`NUMERIC(14, 4)`)
pub const QUANTITY_INTEGER_DIGITS: u32 = 10;

/// Integer digits of a planted area (`NUMERIC(12, 4)`)
pub const AREA_INTEGER_DIGITS: u32 = 8;

/// Integer digits of an expected yield per hectare (`NUMERIC(14, 4)`)
pub const YIELD_INTEGER_DIGITS: u32 = 10;

/// Check that a value survives storage unchanged: at most
/// [`MAX_DECIMAL_PLACES`] decimals and fewer than `integer_digits` digits
/// before the point.
pub fn validate_precision(value: Decimal, integer_digits: u32) -> Result<(), &'static str> {
    if value.normalize().scale() > MAX_DECIMAL_PLACES {
        return Err("Value can have at most 4 decimal places");
    }
    if value.abs() >= Decimal::from(10i64.pow(integer_digits)) {
        return Err("Value exceeds the supported magnitude");
    }
    Ok(())
}

// ============================================================================
// Harvest Validations
// ============================================================================

/// Validate a proposed harvest quantity (must be greater than 0)
pub fn validate_harvest_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Harvested quantity must be greater than 0");
    }
    Ok(())
}

/// Convert a floating point quantity from a browser form.
/// Rejects NaN, infinities and values Decimal cannot represent.
pub fn quantity_from_f64(value: f64) -> Result<Decimal, &'static str> {
    if !value.is_finite() {
        return Err("Quantity must be a finite number");
    }
    Decimal::try_from(value).map_err(|_| "Quantity is out of range")
}

// ============================================================================
// Plan Validations
// ============================================================================

/// Validate planted area in hectares (must be greater than 0 when given)
pub fn validate_planted_area(area_ha: Option<Decimal>) -> Result<(), &'static str> {
    match area_ha {
        Some(area) if area <= Decimal::ZERO => Err("Planted area must be greater than 0"),
        _ => Ok(()),
    }
}

/// Validate expected yield per hectare (cannot be negative when given)
pub fn validate_expected_yield(yield_per_ha: Option<Decimal>) -> Result<(), &'static str> {
    match yield_per_ha {
        Some(y) if y < Decimal::ZERO => Err("Expected yield cannot be negative"),
        _ => Ok(()),
    }
}

/// Validate that a plan's expected end date is not before its start date
pub fn validate_plan_dates(start: NaiveDate, expected_end: NaiveDate) -> Result<(), &'static str> {
    if expected_end < start {
        return Err("Expected end date cannot be before start date");
    }
    Ok(())
}
