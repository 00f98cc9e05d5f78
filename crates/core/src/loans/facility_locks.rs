use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-facility mutual exclusion.
///
/// Every mutation of a facility or of its draws and payments holds the
/// facility's guard for the whole read-validate-write sequence. Different
/// facilities never contend.
#[derive(Clone, Default)]
pub struct FacilityLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FacilityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `loan_id`.
    pub async fn acquire(&self, loan_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(loan_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry of a deleted facility.
    pub fn forget(&self, loan_id: &str) {
        self.locks.remove(loan_id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
