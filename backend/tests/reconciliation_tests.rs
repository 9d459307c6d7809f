//! Harvest reconciliation tests against the in-memory stores
//!
//! Covers:
//! - Plan fulfilment (accept, reject, no ceiling)
//! - Idempotent completion
//! - Harvest append and plan completion failing independently
//! - Per-plan serialization of concurrent submissions

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use farm_backend::error::AppError;
use farm_backend::services::ReconciliationEngine;
use farm_backend::store::{HarvestLedger, MemoryHarvestLedger, MemoryPlanStore, PlanStore};
use shared::models::{HarvestDestination, HarvestRecord, Plan, PlanStatus, UnitOfMeasure};
use shared::reconciliation::cumulative_harvested;
use shared::types::AreaRef;

// ============================================================================
// Fixtures
// ============================================================================

fn plan(planted_area_ha: Option<i64>, expected_yield_per_ha: Option<i64>) -> Plan {
    Plan {
        id: Uuid::new_v4(),
        property_id: Uuid::new_v4(),
        cultivar_id: Uuid::new_v4(),
        area: AreaRef::Sector(Uuid::new_v4()),
        start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        expected_end_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        planted_area_ha: planted_area_ha.map(Decimal::from),
        expected_yield_per_ha: expected_yield_per_ha.map(Decimal::from),
        status: PlanStatus::InProgress,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn harvest(plan_id: Uuid, tons: i64) -> HarvestRecord {
    HarvestRecord {
        id: Uuid::new_v4(),
        plan_id,
        area: None,
        harvest_date: NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(),
        quantity: Decimal::from(tons),
        unit: UnitOfMeasure::Ton,
        destination: HarvestDestination::Sale,
        notes: None,
        created_at: Utc::now(),
    }
}

struct Farm {
    plans: Arc<MemoryPlanStore>,
    ledger: Arc<MemoryHarvestLedger>,
    engine: ReconciliationEngine,
}

impl Farm {
    fn new() -> Self {
        Self::with_ledger(MemoryHarvestLedger::new())
    }

    fn with_ledger(ledger: MemoryHarvestLedger) -> Self {
        let plans = Arc::new(MemoryPlanStore::new());
        let ledger = Arc::new(ledger);
        let engine = ReconciliationEngine::new(plans.clone(), ledger.clone());
        Self {
            plans,
            ledger,
            engine,
        }
    }

    /// Insert a plan with already-recorded harvests
    async fn seed(&self, plan: Plan, existing_tons: &[i64]) -> Plan {
        let plan = self.plans.insert_plan(plan).await.unwrap();
        for tons in existing_tons {
            self.ledger.append_harvest(harvest(plan.id, *tons)).await.unwrap();
        }
        plan
    }

    async fn status(&self, plan_id: Uuid) -> PlanStatus {
        self.plans.get_plan(plan_id).await.unwrap().status
    }

    async fn total(&self, plan_id: Uuid) -> Decimal {
        let harvests = self.ledger.list_harvests_for_plan(plan_id).await.unwrap();
        cumulative_harvested(plan_id, &harvests)
    }
}

fn is_quantity_rejection(err: &AppError) -> bool {
    matches!(err, AppError::Validation { field, .. } if field == "quantity")
}

// ============================================================================
// Scenarios
// ============================================================================

/// 10 ha at 2 t/ha, 15 t harvested, 5 t more fills the plan exactly
#[tokio::test]
async fn test_harvest_reaching_plan_completes_it() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[10, 5]).await;

    let submission = farm.engine.submit_harvest(harvest(p.id, 5)).await.unwrap();

    let completion = submission.completion.unwrap();
    assert!(completion.transitioned);
    assert_eq!(completion.status, PlanStatus::Completed);
    assert_eq!(farm.status(p.id).await, PlanStatus::Completed);
    assert_eq!(farm.total(p.id).await, Decimal::from(20));
}

/// Same plan, 6 t would exceed the 20 t ceiling
#[tokio::test]
async fn test_harvest_exceeding_plan_is_rejected() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[15]).await;

    let err = farm.engine.submit_harvest(harvest(p.id, 6)).await.unwrap_err();

    assert!(is_quantity_rejection(&err));
    assert_eq!(farm.status(p.id).await, PlanStatus::InProgress);
    assert_eq!(farm.total(p.id).await, Decimal::from(15));
    assert_eq!(farm.plans.status_writes(), 0);
}

/// No planted area: no ceiling and no auto-completion
#[tokio::test]
async fn test_plan_without_area_accepts_everything() {
    let farm = Farm::new();
    let p = farm.seed(plan(None, Some(2)), &[]).await;

    for tons in [50, 500, 5000] {
        let submission = farm.engine.submit_harvest(harvest(p.id, tons)).await.unwrap();
        let completion = submission.completion.unwrap();
        assert!(!completion.transitioned);
        assert_eq!(completion.status, PlanStatus::InProgress);
    }

    assert_eq!(farm.total(p.id).await, Decimal::from(5550));
    let outcome = farm.engine.maybe_complete_plan(p.id).await.unwrap();
    assert_eq!(outcome.status, PlanStatus::InProgress);
}

#[tokio::test]
async fn test_partial_harvest_leaves_plan_open() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[]).await;

    let submission = farm.engine.submit_harvest(harvest(p.id, 8)).await.unwrap();

    assert_eq!(
        submission.completion.unwrap().status,
        PlanStatus::InProgress
    );
    assert_eq!(farm.status(p.id).await, PlanStatus::InProgress);
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn test_maybe_complete_plan_is_idempotent() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[12, 8]).await;

    let first = farm.engine.maybe_complete_plan(p.id).await.unwrap();
    let second = farm.engine.maybe_complete_plan(p.id).await.unwrap();

    assert_eq!(first.status, PlanStatus::Completed);
    assert!(first.transitioned);
    assert_eq!(second.status, PlanStatus::Completed);
    assert!(!second.transitioned);
    assert_eq!(farm.plans.status_writes(), 1);
}

#[tokio::test]
async fn test_cancelled_plan_is_never_completed() {
    let farm = Farm::new();
    let mut cancelled = plan(Some(1), Some(1));
    cancelled.status = PlanStatus::Cancelled;
    let p = farm.seed(cancelled, &[1]).await;

    let outcome = farm.engine.maybe_complete_plan(p.id).await.unwrap();

    assert_eq!(outcome.status, PlanStatus::Cancelled);
    assert_eq!(farm.status(p.id).await, PlanStatus::Cancelled);
}

#[tokio::test]
async fn test_unknown_plan_is_not_found() {
    let farm = Farm::new();
    let err = farm
        .engine
        .submit_harvest(harvest(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = farm.engine.maybe_complete_plan(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Partial failures
// ============================================================================

#[tokio::test]
async fn test_failed_status_write_keeps_harvest() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[15]).await;
    farm.plans.set_fail_status_writes(true);

    let submission = farm.engine.submit_harvest(harvest(p.id, 5)).await.unwrap();

    assert!(matches!(submission.completion, Err(AppError::StorageError(_))));
    assert_eq!(farm.total(p.id).await, Decimal::from(20));
    assert_eq!(farm.status(p.id).await, PlanStatus::InProgress);

    // Recoverable: once the store is back, completion catches up
    farm.plans.set_fail_status_writes(false);
    let outcome = farm.engine.maybe_complete_plan(p.id).await.unwrap();
    assert!(outcome.transitioned);
    assert_eq!(farm.status(p.id).await, PlanStatus::Completed);
}

/// A full plan left open by a failed status write completes on the next
/// submission, even though that submission is itself rejected
#[tokio::test]
async fn test_rejection_on_full_plan_retries_completion() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[15]).await;
    farm.plans.set_fail_status_writes(true);
    let submission = farm.engine.submit_harvest(harvest(p.id, 5)).await.unwrap();
    assert!(submission.completion.is_err());

    farm.plans.set_fail_status_writes(false);
    let err = farm.engine.submit_harvest(harvest(p.id, 1)).await.unwrap_err();

    assert!(is_quantity_rejection(&err));
    assert_eq!(farm.status(p.id).await, PlanStatus::Completed);
    assert_eq!(farm.total(p.id).await, Decimal::from(20));
}

#[tokio::test]
async fn test_rejection_on_open_plan_writes_no_status() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[19]).await;

    let err = farm.engine.submit_harvest(harvest(p.id, 2)).await.unwrap_err();

    assert!(is_quantity_rejection(&err));
    assert_eq!(farm.plans.status_writes(), 0);
    assert_eq!(farm.status(p.id).await, PlanStatus::InProgress);
}

#[tokio::test]
async fn test_failed_append_changes_nothing() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[15]).await;
    farm.ledger.set_fail_appends(true);

    let err = farm.engine.submit_harvest(harvest(p.id, 5)).await.unwrap_err();

    assert!(matches!(err, AppError::StorageError(_)));
    assert_eq!(farm.total(p.id).await, Decimal::from(15));
    assert_eq!(farm.status(p.id).await, PlanStatus::InProgress);
}

// ============================================================================
// Overflow
// ============================================================================

/// A ledger total at the top of the Decimal range rejects further harvests
/// instead of panicking the engine
#[tokio::test]
async fn test_total_at_decimal_limit_rejects_instead_of_panicking() {
    let farm = Farm::new();
    let p = farm.seed(plan(None, None), &[]).await;
    let mut huge = harvest(p.id, 0);
    huge.quantity = Decimal::MAX;
    farm.ledger.append_harvest(huge).await.unwrap();

    let err = farm.engine.submit_harvest(harvest(p.id, 1)).await.unwrap_err();
    assert!(is_quantity_rejection(&err));

    let decision = farm
        .engine
        .validate_new_harvest(p.id, Decimal::ONE)
        .await
        .unwrap();
    assert!(!decision.is_accepted());

    let outcome = farm.engine.maybe_complete_plan(p.id).await.unwrap();
    assert_eq!(outcome.status, PlanStatus::InProgress);
    assert_eq!(farm.total(p.id).await, Decimal::MAX);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Submissions for plans that do not exist leave no lock entries behind
#[tokio::test]
async fn test_unknown_plans_do_not_accumulate_locks() {
    let farm = Farm::new();
    for _ in 0..1000 {
        let err = farm
            .engine
            .submit_harvest(harvest(Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
    assert!(farm.engine.locks().tracked().await <= 1);
}

/// Two 12 t submissions against an empty 20 t plan: only one may land
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_are_serialized_per_plan() {
    let farm = Farm::with_ledger(MemoryHarvestLedger::with_read_delay(Duration::from_millis(25)));
    let p = farm.seed(plan(Some(10), Some(2)), &[]).await;

    let first = {
        let engine = farm.engine.clone();
        let record = harvest(p.id, 12);
        tokio::spawn(async move { engine.submit_harvest(record).await })
    };
    let second = {
        let engine = farm.engine.clone();
        let record = harvest(p.id, 12);
        tokio::spawn(async move { engine.submit_harvest(record).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1, "exactly one 12 t submission fits a 20 t plan");
    let rejected = results.iter().filter_map(|r| r.as_ref().err()).next().unwrap();
    assert!(is_quantity_rejection(rejected));
    assert_eq!(farm.total(p.id).await, Decimal::from(12));
    assert_eq!(farm.ledger.record_count().await, 1);
}

/// The check-then-append pattern without the plan lock overfills the plan.
/// This is the race `submit_harvest` exists to prevent.
#[tokio::test]
async fn test_unserialized_check_then_append_overfills() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[]).await;

    // Both callers validate before either one appends
    let first = farm.engine.validate_new_harvest(p.id, Decimal::from(12)).await.unwrap();
    let second = farm.engine.validate_new_harvest(p.id, Decimal::from(12)).await.unwrap();
    assert!(first.is_accepted());
    assert!(second.is_accepted());

    farm.ledger.append_harvest(harvest(p.id, 12)).await.unwrap();
    farm.ledger.append_harvest(harvest(p.id, 12)).await.unwrap();
    assert_eq!(farm.total(p.id).await, Decimal::from(24));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_submissions_never_exceed_plan() {
    let farm = Farm::new();
    let p = farm.seed(plan(Some(10), Some(2)), &[]).await;

    let tasks: Vec<_> = (0..30)
        .map(|_| {
            let engine = farm.engine.clone();
            let record = harvest(p.id, 1);
            tokio::spawn(async move { engine.submit_harvest(record).await })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 20);
    assert_eq!(farm.total(p.id).await, Decimal::from(20));
    assert_eq!(farm.status(p.id).await, PlanStatus::Completed);
    assert_eq!(farm.plans.status_writes(), 1);
}
