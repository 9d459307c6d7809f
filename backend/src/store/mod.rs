//! Plan store and harvest ledger interfaces
//!
//! The reconciliation engine only sees these traits. Rows coming out of a
//! backing store are checked into typed models here, at the boundary, so
//! nothing downstream deals with malformed data.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use shared::models::{HarvestRecord, Plan, PlanStatus};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryHarvestLedger, MemoryPlanStore};
pub use postgres::{PgHarvestLedger, PgPlanStore};

/// Read/write access to planting plans
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Fetch a plan, `AppError::NotFound` if it does not exist
    async fn get_plan(&self, id: Uuid) -> AppResult<Plan>;

    /// Overwrite a plan's status
    async fn set_plan_status(&self, id: Uuid, status: PlanStatus) -> AppResult<()>;

    async fn insert_plan(&self, plan: Plan) -> AppResult<Plan>;

    /// Plans of one property, most recent start date first
    async fn list_plans(&self, property_id: Uuid) -> AppResult<Vec<Plan>>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> AppResult<()>;
}

/// Append-only record of harvest events
#[async_trait]
pub trait HarvestLedger: Send + Sync {
    /// All harvests linked to a plan, in insertion order
    async fn list_harvests_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<HarvestRecord>>;

    async fn append_harvest(&self, record: HarvestRecord) -> AppResult<HarvestRecord>;
}

// Compile-time assertion: both traits are used as trait objects.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore, _: &dyn HarvestLedger) {}
};
