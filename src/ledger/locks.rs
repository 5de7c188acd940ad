//! Per-account write locks.
//!
//! One async mutex per account id, created on first use. Holding the
//! guard serializes in-process writers on that account so the optimistic
//! version check in the store only has to arbitrate writers from other
//! processes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for `account_id`, waiting if another local
    /// writer holds it.
    pub async fn acquire(&self, account_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(account_id).or_default())
        };
        lock.lock_owned().await
    }
}
