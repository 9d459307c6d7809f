//! Business logic services for the Farm Management Platform

pub mod harvest;
pub mod plan;
pub mod plan_locks;
pub mod reconciliation;

pub use harvest::HarvestService;
pub use plan::PlanService;
pub use plan_locks::PlanLocks;
pub use reconciliation::{CompletionOutcome, HarvestSubmission, ReconciliationEngine};
