//! In-process plan store and harvest ledger
//!
//! Used by `storage.backend = "memory"` and by the test suites. Both stores
//! can be told to fail writes so partial-failure paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{HarvestLedger, PlanStore};
use crate::error::{AppError, AppResult};
use shared::models::{HarvestRecord, Plan, PlanStatus};

#[derive(Default)]
pub struct MemoryPlanStore {
    plans: RwLock<HashMap<Uuid, Plan>>,
    fail_status_writes: AtomicBool,
    status_writes: AtomicUsize,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `set_plan_status` calls fail as if the store were down
    pub fn set_fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful status writes so far
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn get_plan(&self, id: Uuid) -> AppResult<Plan> {
        self.plans
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Plan".to_string()))
    }

    async fn set_plan_status(&self, id: Uuid, status: PlanStatus) -> AppResult<()> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(AppError::StorageError("plan store unavailable".to_string()));
        }

        let mut plans = self.plans.write().await;
        let plan = plans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Plan".to_string()))?;
        plan.status = status;
        plan.updated_at = Utc::now();
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_plan(&self, plan: Plan) -> AppResult<Plan> {
        self.plans.write().await.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn list_plans(&self, property_id: Uuid) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.property_id == property_id)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));
        Ok(plans)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHarvestLedger {
    records: RwLock<Vec<HarvestRecord>>,
    fail_appends: AtomicBool,
    read_delay: Option<Duration>,
}

impl MemoryHarvestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose reads take at least `delay`, to widen race windows in tests
    pub fn with_read_delay(delay: Duration) -> Self {
        Self {
            read_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of records across all plans
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl HarvestLedger for MemoryHarvestLedger {
    async fn list_harvests_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<HarvestRecord>> {
        let records: Vec<HarvestRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.plan_id == plan_id)
            .cloned()
            .collect();
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(records)
    }

    async fn append_harvest(&self, record: HarvestRecord) -> AppResult<HarvestRecord> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::StorageError("harvest ledger unavailable".to_string()));
        }
        self.records.write().await.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::models::{HarvestDestination, UnitOfMeasure};
    use shared::types::AreaRef;

    fn plan(property_id: Uuid, start_month: u32) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            property_id,
            cultivar_id: Uuid::new_v4(),
            area: AreaRef::Sector(Uuid::new_v4()),
            start_date: NaiveDate::from_ymd_opt(2024, start_month, 1).unwrap(),
            expected_end_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            planted_area_ha: None,
            expected_yield_per_ha: None,
            status: PlanStatus::Planned,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_status_write_and_fault_injection() {
        let store = MemoryPlanStore::new();
        let p = store.insert_plan(plan(Uuid::new_v4(), 1)).await.unwrap();

        store.set_plan_status(p.id, PlanStatus::InProgress).await.unwrap();
        assert_eq!(store.get_plan(p.id).await.unwrap().status, PlanStatus::InProgress);

        store.set_fail_status_writes(true);
        let err = store.set_plan_status(p.id, PlanStatus::Completed).await;
        assert!(matches!(err, Err(AppError::StorageError(_))));
        assert_eq!(store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_missing_plan_is_not_found() {
        let store = MemoryPlanStore::new();
        let err = store.get_plan(Uuid::new_v4()).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
        let err = store.set_plan_status(Uuid::new_v4(), PlanStatus::Cancelled).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_plans_by_property_newest_first() {
        let store = MemoryPlanStore::new();
        let property = Uuid::new_v4();
        store.insert_plan(plan(property, 2)).await.unwrap();
        store.insert_plan(plan(property, 5)).await.unwrap();
        store.insert_plan(plan(Uuid::new_v4(), 3)).await.unwrap();

        let plans = store.list_plans(property).await.unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans[0].start_date > plans[1].start_date);
    }

    #[tokio::test]
    async fn test_ledger_keeps_insertion_order() {
        let ledger = MemoryHarvestLedger::new();
        let plan_id = Uuid::new_v4();
        for q in [3, 1, 2] {
            ledger
                .append_harvest(HarvestRecord {
                    id: Uuid::new_v4(),
                    plan_id,
                    area: None,
                    harvest_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                    quantity: Decimal::from(q),
                    unit: UnitOfMeasure::Kg,
                    destination: HarvestDestination::Storage,
                    notes: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let quantities: Vec<Decimal> = ledger
            .list_harvests_for_plan(plan_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.quantity)
            .collect();
        assert_eq!(quantities, vec![Decimal::from(3), Decimal::from(1), Decimal::from(2)]);
        assert!(ledger.list_harvests_for_plan(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
