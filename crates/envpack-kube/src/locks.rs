//! Per-release exclusive locks
//!
//! Mutating operations hold the lock for their qualified release name across
//! the whole check-then-act sequence. Operations on different names never
//! contend. Locks are in-process only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::ReleaseError;

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of per-name locks with a bounded wait
#[derive(Clone)]
pub struct ReleaseLocks {
    table: Arc<Mutex<LockTable>>,
    timeout: Duration,
}

/// Held while an operation owns a release name
pub struct ReleaseGuard {
    name: String,
    table: Arc<Mutex<LockTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ReleaseLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for exclusive ownership of `name`, failing with `Busy` after the timeout
    pub async fn acquire(&self, name: &str) -> Result<ReleaseGuard, ReleaseError> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(name.to_string()).or_default().clone()
        };

        let guard = tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(release = %name, waited_ms = self.timeout.as_millis() as u64, "release is busy");
                ReleaseError::Busy {
                    name: name.to_string(),
                    waited: self.timeout,
                }
            })?;

        Ok(ReleaseGuard {
            name: name.to_string(),
            table: self.table.clone(),
            guard: Some(guard),
        })
    }

    /// Number of names currently tracked
    pub fn tracked(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl ReleaseGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        self.guard.take();

        // Waiters clone the entry under the table lock, so a count of one
        // means nobody else holds or waits for this name
        if table
            .get(&self.name)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out() {
        let locks = ReleaseLocks::new(Duration::from_millis(50));
        let _held = locks.acquire("test-a").await.unwrap();

        let result = locks.acquire("test-a").await;
        assert!(matches!(result, Err(ReleaseError::Busy { .. })));
    }

    #[tokio::test]
    async fn test_different_names_do_not_contend() {
        let locks = ReleaseLocks::new(Duration::from_millis(50));
        let _a = locks.acquire("test-a").await.unwrap();
        let b = locks.acquire("test-b").await.unwrap();
        assert_eq!(b.name(), "test-b");
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let locks = ReleaseLocks::new(Duration::from_millis(50));
        {
            let _held = locks.acquire("test-a").await.unwrap();
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
        assert!(locks.acquire("test-a").await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let locks = ReleaseLocks::new(Duration::from_secs(5));
        let held = locks.acquire("test-a").await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire("test-a").await.map(|g| g.name().to_string()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert_eq!(waiter.await.unwrap().unwrap(), "test-a");
    }
}
