//! Key-addressed query cache with stale-while-revalidate reads.
//!
//! Each key holds the last successful result of its query. Reads return that
//! result immediately and start a background refresh once it is older than
//! the query's stale time. Concurrent reads of a key share one in-flight
//! request. Writers call [`QueryCache::invalidate`] to force a refetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::config::QueryPolicy;
use crate::fetch::FetchError;

type FetchFn<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, FetchError>> + Send + Sync>;
type InFlight<V> = Shared<BoxFuture<'static, Result<Arc<V>, FetchError>>>;
type Entries<V> = Mutex<HashMap<String, Entry<V>>>;

/// A named query: its cache key, policy and the fetch that produces it.
pub struct Query<V> {
    key: String,
    policy: QueryPolicy,
    fetch: FetchFn<V>,
}

impl<V> Clone for Query<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            policy: self.policy,
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<V: Send + 'static> Query<V> {
    pub fn new<F, Fut>(key: impl Into<String>, policy: QueryPolicy, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        Self {
            key: key.into(),
            policy,
            fetch: Arc::new(move || fetch().boxed()),
        }
    }
}

impl<V> Query<V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> QueryPolicy {
        self.policy
    }
}

struct Entry<V> {
    data: Option<Arc<V>>,
    updated_at: Option<Instant>,
    last_read: Instant,
    invalidated: bool,
    /// Bumped by every invalidation. Only a request issued at the current
    /// generation clears `invalidated`.
    generation: u64,
    in_flight: Option<InFlight<V>>,
    in_flight_generation: u64,
    gc_time: Duration,
}

impl<V> Entry<V> {
    fn new(now: Instant, gc_time: Duration) -> Self {
        Self {
            data: None,
            updated_at: None,
            last_read: now,
            invalidated: false,
            generation: 0,
            in_flight: None,
            in_flight_generation: 0,
            gc_time,
        }
    }

    /// The request to wait on, starting one when none is in flight, and
    /// whether it was issued after the latest invalidation.
    fn request(&mut self, start: impl FnOnce(u64) -> InFlight<V>) -> (InFlight<V>, bool) {
        if let Some(request) = &self.in_flight {
            return (request.clone(), self.in_flight_generation == self.generation);
        }
        let request = start(self.generation);
        self.in_flight = Some(request.clone());
        self.in_flight_generation = self.generation;
        (request, true)
    }

    fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
        match self.updated_at {
            Some(at) => now.duration_since(at) >= stale_time,
            None => true,
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.in_flight.is_none() && now.duration_since(self.last_read) >= self.gc_time
    }

    /// Forget data nobody has read within the gc window.
    fn expire_if_idle(&mut self, now: Instant) {
        if self.data.is_some() && self.is_idle(now) {
            self.data = None;
            self.updated_at = None;
            self.invalidated = false;
        }
    }
}

/// Cache of query results of type `V`, keyed by query key.
pub struct QueryCache<V> {
    entries: Arc<Entries<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<V>(entries: &Entries<V>) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<V: Send + Sync + 'static> QueryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `query`'s value.
    ///
    /// Cached data is returned at once, whatever its age; a stale entry also
    /// starts a background refresh. Without cached data (or after an
    /// invalidation) the read waits for the shared in-flight request. If that
    /// request fails, previously cached data is returned when there is any.
    pub async fn get(&self, query: &Query<V>) -> Result<Arc<V>, FetchError> {
        loop {
            let now = Instant::now();
            let (pending, current) = {
                let mut entries = lock(&self.entries);
                let entry = entries
                    .entry(query.key.clone())
                    .or_insert_with(|| Entry::new(now, query.policy.gc_time));
                entry.expire_if_idle(now);
                entry.last_read = now;

                let cached = entry.data.clone().filter(|_| !entry.invalidated);
                if let Some(data) = cached {
                    if entry.in_flight.is_none() && entry.is_stale(now, query.policy.stale_time) {
                        tracing::debug!(key = %query.key, "entry is stale, refreshing in background");
                        let _ = entry.request(|generation| self.start_fetch(query, generation));
                    }
                    return Ok(data);
                }
                entry.request(|generation| self.start_fetch(query, generation))
            };
            let result = pending.await;
            if current {
                return self.settle_read(query, result);
            }
            // Issued before the latest invalidation; wait for the refetch.
        }
    }

    /// Mark `query` stale and refetch it now, waiting for the result.
    ///
    /// A request already in flight may have been issued before the write
    /// that caused the invalidation, so it is allowed to finish and a new one
    /// is started afterwards.
    pub async fn invalidate(&self, query: &Query<V>) -> Result<Arc<V>, FetchError> {
        let earlier = {
            let mut entries = lock(&self.entries);
            let entry = entries
                .entry(query.key.clone())
                .or_insert_with(|| Entry::new(Instant::now(), query.policy.gc_time));
            entry.invalidated = true;
            entry.generation += 1;
            entry.in_flight.clone()
        };
        if let Some(earlier) = earlier {
            let _ = earlier.await;
        }

        let pending = {
            let mut entries = lock(&self.entries);
            let entry = entries
                .entry(query.key.clone())
                .or_insert_with(|| Entry::new(Instant::now(), query.policy.gc_time));
            entry.last_read = Instant::now();
            entry.request(|generation| self.start_fetch(query, generation)).0
        };
        tracing::debug!(key = %query.key, "invalidated, refetching");
        self.settle_read(query, pending.await)
    }

    /// Evict entries idle for longer than their gc time. Returns the number
    /// of evicted keys.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, entry| {
            let idle = entry.is_idle(now);
            if idle {
                tracing::debug!(key = %key, "evicting idle cache entry");
            }
            !idle
        });
        before - entries.len()
    }

    /// Cached data for `key` without triggering any fetch.
    pub fn peek(&self, key: &str) -> Option<Arc<V>> {
        lock(&self.entries).get(key).and_then(|e| e.data.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the query's fetch (with retries) and return a handle every
    /// reader can await. The spawned task keeps the request running even if
    /// every reader goes away.
    fn start_fetch(&self, query: &Query<V>, generation: u64) -> InFlight<V> {
        let entries = Arc::downgrade(&self.entries);
        let key = query.key.clone();
        let fetch = Arc::clone(&query.fetch);
        let policy = query.policy;

        let request = async move {
            let result = fetch_with_retry(&key, &fetch, policy).await.map(Arc::new);
            if let Some(entries) = entries.upgrade() {
                store_result(&entries, &key, generation, &result);
            }
            result
        }
        .boxed()
        .shared();

        tokio::spawn(request.clone());
        request
    }

    fn settle_read(
        &self,
        query: &Query<V>,
        result: Result<Arc<V>, FetchError>,
    ) -> Result<Arc<V>, FetchError> {
        match result {
            Ok(data) => Ok(data),
            Err(err) => match self.peek(&query.key) {
                Some(previous) => {
                    tracing::warn!(key = %query.key, error = %err, "fetch failed, serving cached data");
                    Ok(previous)
                }
                None => Err(err),
            },
        }
    }
}

async fn fetch_with_retry<V>(
    key: &str,
    fetch: &FetchFn<V>,
    policy: QueryPolicy,
) -> Result<V, FetchError> {
    let mut attempt = 0;
    loop {
        match (**fetch)().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retry => {
                attempt += 1;
                tracing::warn!(key, attempt, error = %err, "query failed, retrying");
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Replace the entry's data with a settled result under the lock. A result
/// from before the latest invalidation is kept, but the entry stays
/// invalidated.
fn store_result<V>(
    entries: &Entries<V>,
    key: &str,
    generation: u64,
    result: &Result<Arc<V>, FetchError>,
) {
    let mut entries = lock(entries);
    let Some(entry) = entries.get_mut(key) else {
        return;
    };
    if entry.in_flight_generation == generation {
        entry.in_flight = None;
    }
    match result {
        Ok(data) => {
            entry.data = Some(Arc::clone(data));
            entry.updated_at = Some(Instant::now());
            if generation == entry.generation {
                entry.invalidated = false;
            }
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "query failed, keeping previous data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const POLICY: QueryPolicy = QueryPolicy {
        stale_time: Duration::from_secs(60),
        gc_time: Duration::from_secs(300),
        retry: 1,
        retry_delay: Duration::from_secs(1),
    };

    /// Each call returns the call number after `delay`.
    fn counting(calls: Arc<AtomicUsize>, delay: Duration) -> Query<usize> {
        Query::new("numbers", POLICY, move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(n)
            }
        })
    }

    /// Succeeds only for calls numbered in `ok_calls`.
    fn flaky(calls: Arc<AtomicUsize>, ok_calls: &'static [usize]) -> Query<usize> {
        Query::new("flaky", POLICY, move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if ok_calls.contains(&n) {
                    Ok(n)
                } else {
                    Err(FetchError::Store(format!("call {n} failed")))
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::from_millis(100));
        let cache = QueryCache::new();

        let (a, b) = tokio::join!(cache.get(&query), cache.get(&query));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(*a, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_are_not_refetched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::ZERO);
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_served_then_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::ZERO);
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        tokio::time::advance(POLICY.stale_time + Duration::from_secs(1)).await;

        // Served immediately from cache while the refresh runs.
        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.get(&query).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_is_retried_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = flaky(calls.clone(), &[2]);
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_without_cache_is_an_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = flaky(calls.clone(), &[]);
        let cache = QueryCache::new();

        let err = cache.get(&query).await.unwrap_err();
        assert_eq!(err, FetchError::Store("call 2 failed".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_cached_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = flaky(calls.clone(), &[1]);
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        assert_eq!(*cache.invalidate(&query).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_refetches_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::ZERO);
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        assert_eq!(*cache.invalidate(&query).await.unwrap(), 2);
        assert_eq!(*cache.get(&query).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_during_invalidation_wait_for_new_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::from_millis(50));
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        let (invalidated, read) = tokio::join!(cache.invalidate(&query), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.get(&query).await
        });
        assert_eq!(*invalidated.unwrap(), 2);
        assert_eq!(*read.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_after_invalidation_skip_requests_issued_before_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::from_millis(50));
        let cache = QueryCache::new();

        assert_eq!(*cache.get(&query).await.unwrap(), 1);
        tokio::time::advance(POLICY.stale_time + Duration::from_secs(1)).await;
        // Starts background request 2, which predates the write below.
        assert_eq!(*cache.get(&query).await.unwrap(), 1);

        let (invalidated, read) = tokio::join!(cache.invalidate(&query), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.get(&query).await
        });
        assert_eq!(*invalidated.unwrap(), 3);
        assert_eq!(*read.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*cache.get(&query).await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::ZERO);
        let cache = QueryCache::new();

        cache.get(&query).await.unwrap();
        assert_eq!(cache.collect_garbage(), 0);

        tokio::time::advance(POLICY.gc_time + Duration::from_secs(1)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());

        assert_eq!(*cache.get(&query).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_data_is_not_served_after_gc_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = counting(calls.clone(), Duration::ZERO);
        let cache = QueryCache::new();

        cache.get(&query).await.unwrap();
        tokio::time::advance(POLICY.gc_time + Duration::from_secs(1)).await;
        assert_eq!(*cache.get(&query).await.unwrap(), 2);
        assert_eq!(cache.peek("numbers").as_deref(), Some(&2));
    }
}
