//! Planting plan models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::AreaRef;

/// A planting plan (`planejamento`): what is grown where, over which
/// period, and how much it is expected to yield
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub property_id: Uuid,
    pub cultivar_id: Uuid,
    pub area: AreaRef,
    pub start_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    /// Planted area in hectares
    pub planted_area_ha: Option<Decimal>,
    /// Expected yield in mass per hectare
    pub expected_yield_per_ha: Option<Decimal>,
    pub status: PlanStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planned => "planned",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled plans never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Cancelled)
    }

    /// Whether a plan may move from `self` to `next`.
    ///
    /// `planned -> in_progress` and `* -> cancelled` are user actions,
    /// `* -> completed` is driven by harvest reconciliation.
    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        match (self, next) {
            (PlanStatus::Planned, PlanStatus::InProgress) => true,
            (PlanStatus::Planned | PlanStatus::InProgress, PlanStatus::Completed) => true,
            (PlanStatus::Planned | PlanStatus::InProgress, PlanStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown plan status: {0}")]
pub struct UnknownPlanStatus(pub String);

impl std::str::FromStr for PlanStatus {
    type Err = UnknownPlanStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(PlanStatus::Planned),
            "in_progress" => Ok(PlanStatus::InProgress),
            "completed" => Ok(PlanStatus::Completed),
            "cancelled" => Ok(PlanStatus::Cancelled),
            other => Err(UnknownPlanStatus(other.to_string())),
        }
    }
}
