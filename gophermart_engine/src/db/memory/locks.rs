use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A registry of per-row locks, keyed by primary key. Entries are created on first use and live as long as the
/// registry, which matches the ledger's rows: they are never deleted.
pub struct RowLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for RowLocks<K> {
    fn default() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }
}

impl<K: Clone + Eq + Hash> RowLocks<K> {
    fn row(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Waits for the row lock. Returns `None` if it could not be acquired within `timeout`.
    pub async fn lock(&self, key: &K, timeout: Duration) -> Option<OwnedMutexGuard<()>> {
        let row = self.row(key);
        tokio::time::timeout(timeout, row.lock_owned()).await.ok()
    }

    /// Takes the row lock only if nobody holds it.
    pub fn try_lock(&self, key: &K) -> Option<OwnedMutexGuard<()>> {
        self.row(key).try_lock_owned().ok()
    }
}
