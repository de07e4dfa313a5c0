//! Per-key coalescing of concurrent fetches.
//!
//! The first caller for a key starts the work on a spawned task; callers that
//! arrive while it runs await the same shared result. The task removes its key
//! when it finishes, so the next call after completion starts fresh work.
//! Because the work is spawned, it runs to completion even if every caller is
//! dropped.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;

use crate::FetchError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

/// Map of fetches currently running, keyed by what they fetch.
pub struct InFlight<K, V> {
    pending: Arc<Mutex<HashMap<K, SharedFetch<V>>>>,
}

impl<K, V> Clone for InFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the fetch running for `key`, or starts one with `start`.
    ///
    /// `start` is only invoked when no fetch for `key` is running.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut pending = self
                .pending
                .lock()
                .expect("in-flight map lock is not poisoned");

            match pending.get(&key) {
                Some(existing) => {
                    debug!("joining in-flight fetch for {key:?}");
                    existing.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let own_key = key.clone();
                    let work = start();
                    // The key is inserted below while the lock is still held,
                    // so the task cannot remove it before it exists.
                    let handle = tokio::spawn(async move {
                        let result = work.await;
                        registry
                            .lock()
                            .expect("in-flight map lock is not poisoned")
                            .remove(&own_key);
                        result
                    });

                    let shared = async move {
                        handle.await.unwrap_or_else(|error| {
                            Err(FetchError::internal(format!("fetch task failed: {error}")))
                        })
                    }
                    .boxed()
                    .shared();
                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending
            .lock()
            .expect("in-flight map lock is not poisoned")
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .expect("in-flight map lock is not poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let inflight: InFlight<&'static str, u32> = InFlight::new();
        let started = Arc::new(AtomicUsize::new(0));

        let call = |inflight: InFlight<&'static str, u32>, started: Arc<AtomicUsize>| async move {
            inflight
                .run("AAPL", move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(42)
                    }
                })
                .await
        };

        let (first, second) = tokio::join!(
            call(inflight.clone(), Arc::clone(&started)),
            call(inflight.clone(), Arc::clone(&started))
        );

        assert_eq!(first, Ok(42));
        assert_eq!(second, Ok(42));
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn errors_are_shared_and_key_is_released() {
        let inflight: InFlight<u8, u32> = InFlight::new();

        let failed = inflight
            .run(1, || async { Err(FetchError::network("down")) })
            .await;
        assert_eq!(failed.map_err(|error| error.code()), Err("fetch.network"));
        assert!(!inflight.is_pending(&1));

        let retried = inflight.run(1, || async { Ok(7) }).await;
        assert_eq!(retried, Ok(7));
    }

    #[tokio::test]
    async fn work_completes_when_caller_is_dropped() {
        let inflight: InFlight<u8, ()> = InFlight::new();
        let done = Arc::new(AtomicUsize::new(0));
        let marker = Arc::clone(&done);

        let caller = inflight.run(1, move || async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            marker.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        // Poll once so the work is spawned, then abandon the caller.
        let _ = tokio::time::timeout(Duration::from_millis(1), caller).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }
}
