//! Per-plan mutual exclusion for harvest reconciliation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per plan id, created on first use.
///
/// Holding the guard for a plan excludes every other reconciliation of the
/// same plan; different plans never wait on each other. Entries nobody
/// holds or waits on are dropped on the next `acquire`, so the map only
/// grows with the number of plans in flight.
#[derive(Default)]
pub struct PlanLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PlanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `plan_id`
    pub async fn acquire(&self, plan_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Only the map holds an idle entry's Arc
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry(plan_id)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of plan entries currently in the map
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
