//! Named locks serialising edits to a shared parent resource

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-name mutexes, created on first use
#[derive(Clone, Default)]
pub struct NamedLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock called `name` until the guard is dropped
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        tracing::debug!("Acquiring lock {:?}", name);
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = NamedLocks::new();
        let guard = locks.lock("domain-service").await;

        let mut waiter = task::spawn(locks.lock("domain-service"));
        assert_pending!(waiter.poll());

        drop(guard);
        assert!(waiter.is_woken());
        let _guard = assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = NamedLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b")).await;
        assert!(b.is_ok());
    }
}
