use std::sync::Arc;

use converge_core::ResourceKey;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per resource key.
///
/// Holding the guard means no other reconciliation sharing this table is
/// touching the same `(kind, identity)`. Entries are dropped once nobody
/// holds or waits on them.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: DashMap<ResourceKey, Arc<Mutex<()>>>,
}

/// Held for the duration of one reconciliation of a key.
#[derive(Debug)]
pub struct IdentityGuard<'a> {
    locks: &'a IdentityLocks,
    key: ResourceKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &ResourceKey) -> IdentityGuard<'_> {
        // Clone the Arc out so the map shard isn't held across the await.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        IdentityGuard {
            locks: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// True if some task currently holds the lock for `key`.
    pub fn is_locked(&self, key: &ResourceKey) -> bool {
        let Some(lock) = self.locks.get(key) else {
            return false;
        };
        let locked = lock.try_lock().is_err();
        locked
    }

    /// Keys with a holder or a waiter.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own Arc, so a count of one means only the map is left.
        // `remove_if` runs under the shard lock, racing safely with `lock()`.
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
