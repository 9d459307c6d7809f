//! Harvest models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AreaRef;

/// A harvest record (`colheita`). Append-only once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    /// Where the crop was picked; informational only
    pub area: Option<AreaRef>,
    pub harvest_date: NaiveDate,
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub destination: HarvestDestination,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Unit a harvested quantity is recorded in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    Kg,
    Ton,
    Box,
    Bunch,
    Unit,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::Ton => "ton",
            UnitOfMeasure::Box => "box",
            UnitOfMeasure::Bunch => "bunch",
            UnitOfMeasure::Unit => "unit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kg" => Some(UnitOfMeasure::Kg),
            "ton" => Some(UnitOfMeasure::Ton),
            "box" => Some(UnitOfMeasure::Box),
            "bunch" => Some(UnitOfMeasure::Bunch),
            "unit" => Some(UnitOfMeasure::Unit),
            _ => None,
        }
    }
}

/// What happens to the harvested produce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HarvestDestination {
    Sale,
    Storage,
    Processing,
    OwnConsumption,
    Donation,
    Loss,
}

impl HarvestDestination {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestDestination::Sale => "sale",
            HarvestDestination::Storage => "storage",
            HarvestDestination::Processing => "processing",
            HarvestDestination::OwnConsumption => "own_consumption",
            HarvestDestination::Donation => "donation",
            HarvestDestination::Loss => "loss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(HarvestDestination::Sale),
            "storage" => Some(HarvestDestination::Storage),
            "processing" => Some(HarvestDestination::Processing),
            "own_consumption" => Some(HarvestDestination::OwnConsumption),
            "donation" => Some(HarvestDestination::Donation),
            "loss" => Some(HarvestDestination::Loss),
            _ => None,
        }
    }
}
