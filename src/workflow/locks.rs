//! Per-namespace mutual exclusion for the check-then-ingest sequence.
//!
//! Without a lease, two concurrent requests for the same uncached document both
//! observe a cache miss and both ingest, duplicating every chunk. The registry
//! hands out one async mutex per namespace; entries persist for the process
//! lifetime. This covers single-process deployments; a distributed lease would
//! replace the registry behind the same call shape.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-namespace async mutexes.
#[derive(Default)]
pub(crate) struct NamespaceLocks {
    entries: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NamespaceLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease for a namespace, waiting if another task holds it.
    pub(crate) async fn acquire(&self, namespace: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self.entries.lock().expect("namespace lock registry poisoned");
            entries
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_namespace_is_serialized() {
        let locks = NamespaceLocks::new();
        let guard = locks.acquire("pdf-aaa").await;

        let blocked = timeout(Duration::from_millis(50), locks.acquire("pdf-aaa")).await;
        assert!(blocked.is_err(), "second acquire should wait");

        drop(guard);
        let reacquired = timeout(Duration::from_millis(50), locks.acquire("pdf-aaa")).await;
        assert!(reacquired.is_ok(), "lease should be free after release");
    }

    #[tokio::test]
    async fn different_namespaces_are_independent() {
        let locks = NamespaceLocks::new();
        let _guard = locks.acquire("pdf-aaa").await;

        let other = timeout(Duration::from_millis(50), locks.acquire("pdf-bbb")).await;
        assert!(other.is_ok(), "unrelated namespace should not block");
    }
}
