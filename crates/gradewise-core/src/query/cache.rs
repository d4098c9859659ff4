//! Query cache
//!
//! Holds the last result of every read, keyed by [`QueryKey`], with:
//! - de-duplication of concurrent identical reads (one loader call per key)
//! - namespace invalidation after writes, following the [`InvalidationGraph`]
//! - time-based staleness for polled resources
//! - per-key fetch status and per-resource in-flight write counters

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use super::graph::InvalidationGraph;
use super::key::QueryKey;
use crate::api::ResourceKind;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Recommendations are refetched this often while watched
pub const RECOMMENDATION_POLL_INTERVAL: Duration = Duration::from_secs(30);

type CachedValue = Arc<dyn Any + Send + Sync>;

// ============================================================================
// Policy
// ============================================================================

/// Freshness rules per resource kind
///
/// Kinds with a poll interval go stale once their data is older than the
/// interval. Every other kind stays fresh until invalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    poll_intervals: HashMap<ResourceKind, Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::no_polling()
            .with_poll_interval(ResourceKind::Recommendation, RECOMMENDATION_POLL_INTERVAL)
    }
}

impl CachePolicy {
    pub fn no_polling() -> Self {
        Self {
            poll_intervals: HashMap::new(),
        }
    }

    pub fn with_poll_interval(mut self, kind: ResourceKind, interval: Duration) -> Self {
        self.poll_intervals.insert(kind, interval);
        self
    }

    pub fn poll_interval(&self, kind: ResourceKind) -> Option<Duration> {
        self.poll_intervals.get(&kind).copied()
    }
}

// ============================================================================
// Entries and status
// ============================================================================

#[derive(Default)]
struct Entry {
    value: Option<CachedValue>,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    invalidated: bool,
    is_fetching: bool,
    error: Option<String>,
    /// Outcome of the last fetch when it failed, handed to waiting callers
    last_failure: Option<Error>,
    /// Number of completed fetches
    generation: u64,
}

impl Entry {
    fn is_fresh(&self, poll_interval: Option<Duration>) -> bool {
        if self.value.is_none() || self.invalidated {
            return false;
        }
        match (poll_interval, self.fetched_at) {
            (Some(interval), Some(at)) => at.elapsed() < interval,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Observable state of one cached read
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatus {
    /// No data yet and a fetch is in flight
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub has_data: bool,
    /// Message of the last failed fetch, cleared by the next success
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// QueryCache
// ============================================================================

pub struct QueryCache {
    policy: CachePolicy,
    graph: InvalidationGraph,
    entries: RwLock<HashMap<QueryKey, Entry>>,
    in_flight: Mutex<HashMap<QueryKey, Arc<Mutex<()>>>>,
    mutations: HashMap<ResourceKind, AtomicUsize>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CachePolicy::default(), InvalidationGraph::default())
    }
}

impl QueryCache {
    pub fn new(policy: CachePolicy, graph: InvalidationGraph) -> Self {
        Self {
            policy,
            graph,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            mutations: ResourceKind::ALL
                .iter()
                .map(|kind| (*kind, AtomicUsize::new(0)))
                .collect(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn graph(&self) -> &InvalidationGraph {
        &self.graph
    }

    /// Return the cached value for `key` if fresh, otherwise run `loader`
    ///
    /// Concurrent calls for the same key wait for the first loader and all
    /// receive its outcome, success or failure. A caller that waited through
    /// an invalidation runs its own loader instead. A failed fetch keeps the
    /// previous value visible through [`peek`](Self::peek).
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, loader: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let poll_interval = self.policy.poll_interval(key.kind);

        let seen_generation = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) => {
                    if entry.is_fresh(poll_interval) {
                        if let Some(value) = entry.value.clone() {
                            return downcast(key, value);
                        }
                    }
                    entry.generation
                }
                None => 0,
            }
        };

        let lock = self.key_lock(key).await;
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(key, poll_interval, seen_generation, loader)
                .await
        };
        self.release_key_lock(key, &lock).await;
        result
    }

    async fn fetch_locked<T, F, Fut>(
        &self,
        key: &QueryKey,
        poll_interval: Option<Duration>,
        seen_generation: u64,
        loader: F,
    ) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(key.clone()).or_default();

            // Another caller finished a fetch while we waited: share it,
            // unless a write invalidated the entry after that fetch began
            if entry.generation != seen_generation && !entry.invalidated {
                if let Some(failure) = &entry.last_failure {
                    return Err(failure.to_shared());
                }
                if let Some(value) = entry.value.clone() {
                    return downcast(key, value);
                }
            }
            if entry.is_fresh(poll_interval) {
                if let Some(value) = entry.value.clone() {
                    return downcast(key, value);
                }
            }

            entry.is_fetching = true;
            entry.invalidated = false;
        }

        log::debug!("[query:cache] Fetching {}", key);
        let result = loader().await;

        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.clone()).or_default();
        entry.is_fetching = false;
        entry.generation += 1;

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                let cached: CachedValue = value.clone();
                entry.value = Some(cached);
                entry.fetched_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now());
                entry.error = None;
                entry.last_failure = None;
                Ok(value)
            }
            Err(e) => {
                log::warn!("[query:cache] Fetch of {} failed: {}", key, e);
                entry.error = Some(e.to_string());
                entry.last_failure = Some(e.to_shared());
                Err(e)
            }
        }
    }

    async fn key_lock(&self, key: &QueryKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_key_lock(&self, key: &QueryKey, lock: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // Only the map and this caller still hold it
        if Arc::strong_count(lock) == 2 {
            in_flight.remove(key);
        }
    }

    /// Cached value regardless of freshness
    pub async fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.entries.read().await;
        let value = entries.get(key)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    pub async fn status(&self, key: &QueryKey) -> QueryStatus {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => QueryStatus {
                is_loading: entry.is_fetching && entry.value.is_none(),
                is_fetching: entry.is_fetching,
                is_stale: !entry.is_fresh(self.policy.poll_interval(key.kind)),
                has_data: entry.value.is_some(),
                error: entry.error.clone(),
                updated_at: entry.updated_at,
            },
            None => QueryStatus {
                is_stale: true,
                ..Default::default()
            },
        }
    }

    /// Mark every entry of `written` and its dependents stale
    ///
    /// Returns how many entries were marked.
    pub async fn invalidate(&self, written: ResourceKind) -> usize {
        let affected = self.graph.affected(written);
        let mut entries = self.entries.write().await;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if affected.contains(&key.kind) {
                entry.invalidated = true;
                count += 1;
            }
        }
        log::debug!(
            "[query:cache] Write to {} invalidated {} entries across {:?}",
            written,
            count,
            affected
        );
        count
    }

    /// Mark a single entry stale
    pub async fn invalidate_key(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.write().await.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Drop every entry, e.g. after logout
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether a write to `kind` is in flight
    pub fn is_mutating(&self, kind: ResourceKind) -> bool {
        self.mutations
            .get(&kind)
            .map_or(false, |count| count.load(Ordering::SeqCst) > 0)
    }

    /// Run a write, tracking it as in flight, and invalidate on success
    pub async fn mutate<T, Fut>(&self, kind: ResourceKind, write: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let _guard = MutationGuard::new(self.mutations.get(&kind));
        let result = write.await;
        match &result {
            Ok(_) => {
                self.invalidate(kind).await;
            }
            Err(e) => log::warn!("[query:cache] Write to {} failed: {}", kind, e),
        }
        result
    }
}

/// Keeps a resource's write counter raised while alive
struct MutationGuard<'a> {
    counter: Option<&'a AtomicUsize>,
}

impl<'a> MutationGuard<'a> {
    fn new(counter: Option<&'a AtomicUsize>) -> Self {
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Self { counter }
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if let Some(counter) = self.counter {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| Error::internal(format!("cached value for {} has an unexpected type", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassFilters, EnrollmentFilters, GradeFilters};

    fn key(kind: ResourceKind, filters: &impl Serialize) -> QueryKey {
        QueryKey::list(kind, filters).unwrap()
    }

    async fn load_count(cache: &QueryCache, key: &QueryKey, calls: &AtomicUsize) -> Result<Arc<usize>> {
        cache
            .fetch(key, || async {
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
    }

    // ========================================================================
    // Freshness
    // ========================================================================

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let k = key(ResourceKind::Subject, &serde_json::json!({}));

        assert_eq!(*load_count(&cache, &k, &calls).await.unwrap(), 1);
        assert_eq!(*load_count(&cache, &k, &calls).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_structurally_equal_filters_share_entry() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);

        let first = GradeFilters {
            class_id: Some("c-1".to_string()),
            ..Default::default()
        };
        let second = first.clone();
        load_count(&cache, &key(ResourceKind::Grade, &first), &calls).await.unwrap();
        load_count(&cache, &key(ResourceKind::Grade, &second), &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_polled_kind_goes_stale_after_interval() {
        let policy = CachePolicy::no_polling()
            .with_poll_interval(ResourceKind::Recommendation, Duration::from_millis(30));
        let cache = QueryCache::new(policy, InvalidationGraph::default());
        let calls = AtomicUsize::new(0);
        let polled = key(ResourceKind::Recommendation, &serde_json::json!({"classId": "c-1"}));
        let plain = key(ResourceKind::Class, &ClassFilters::default());

        load_count(&cache, &polled, &calls).await.unwrap();
        load_count(&cache, &plain, &calls).await.unwrap();
        assert!(!cache.status(&polled).await.is_stale);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.status(&polled).await.is_stale);
        assert!(!cache.status(&plain).await.is_stale);

        load_count(&cache, &polled, &calls).await.unwrap();
        load_count(&cache, &plain, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_policy_polls_recommendations_only() {
        let policy = CachePolicy::default();
        assert_eq!(
            policy.poll_interval(ResourceKind::Recommendation),
            Some(Duration::from_secs(30))
        );
        assert_eq!(policy.poll_interval(ResourceKind::Grade), None);
    }

    // ========================================================================
    // De-duplication
    // ========================================================================

    #[tokio::test]
    async fn test_concurrent_reads_share_one_loader_call() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let k = key(ResourceKind::Enrollment, &EnrollmentFilters::for_class("c-1"));

        let slow = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec!["e-1".to_string()])
        };
        let (a, b, c) = tokio::join!(
            cache.fetch(&k, slow),
            cache.fetch(&k, slow),
            cache.fetch(&k, slow)
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_failure() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let k = key(ResourceKind::Subject, &serde_json::json!({}));

        let failing = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Err::<u32, _>(Error::api(Some(500), "boom"))
        };
        let (a, b) = tokio::join!(cache.fetch(&k, failing), cache.fetch(&k, failing));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(a, Err(Error::Api { status: Some(500), .. })));
        assert!(matches!(b, Err(Error::Api { status: Some(500), .. })));
    }

    // ========================================================================
    // Status
    // ========================================================================

    #[tokio::test]
    async fn test_status_while_loading() {
        let cache = QueryCache::default();
        let k = key(ResourceKind::Grade, &serde_json::json!({"classId": "c-1"}));

        let (result, during) = tokio::join!(
            cache.fetch(&k, || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(1u8)
            }),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.status(&k).await
            }
        );
        result.unwrap();
        assert!(during.is_loading);
        assert!(during.is_fetching);

        let after = cache.status(&k).await;
        assert!(!after.is_loading);
        assert!(!after.is_fetching);
        assert!(after.has_data);
        assert!(after.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let cache = QueryCache::default();
        let k = key(ResourceKind::Subject, &serde_json::json!({}));

        cache.fetch(&k, || async { Ok(7u32) }).await.unwrap();
        cache.invalidate(ResourceKind::Subject).await;
        let err = cache
            .fetch(&k, || async { Err::<u32, _>(Error::api(Some(502), "bad gateway")) })
            .await;
        assert!(err.is_err());

        let status = cache.status(&k).await;
        assert!(status.has_data);
        assert!(status.error.unwrap().contains("bad gateway"));
        assert_eq!(*cache.peek::<u32>(&k).await.unwrap(), 7);

        cache.fetch(&k, || async { Ok(8u32) }).await.unwrap();
        assert!(cache.status(&k).await.error.is_none());
    }

    #[tokio::test]
    async fn test_status_of_unknown_key() {
        let cache = QueryCache::default();
        let status = cache
            .status(&QueryKey::item(ResourceKind::Class, "missing"))
            .await;
        assert!(!status.has_data);
        assert!(status.is_stale);
        assert!(!status.is_fetching);
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    #[tokio::test]
    async fn test_enrollment_write_invalidates_classes_not_grades() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let roster = key(ResourceKind::Enrollment, &EnrollmentFilters::for_class("c-1"));
        let classes = key(ResourceKind::Class, &ClassFilters::default());
        let grades = key(ResourceKind::Grade, &serde_json::json!({"classId": "c-1"}));

        for k in [&roster, &classes, &grades] {
            load_count(&cache, k, &calls).await.unwrap();
        }

        assert_eq!(cache.invalidate(ResourceKind::Enrollment).await, 2);
        assert!(cache.status(&roster).await.is_stale);
        assert!(cache.status(&classes).await.is_stale);
        assert!(!cache.status(&grades).await.is_stale);
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_keeps_entry_stale() {
        let cache = QueryCache::default();
        let k = key(ResourceKind::Class, &ClassFilters::default());

        let (result, _) = tokio::join!(
            cache.fetch(&k, || async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(1u8)
            }),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.invalidate(ResourceKind::Class).await
            }
        );
        result.unwrap();
        assert!(cache.status(&k).await.is_stale);
    }

    #[tokio::test]
    async fn test_read_after_invalidation_does_not_share_older_fetch() {
        let cache = QueryCache::default();
        let k = QueryKey::item(ResourceKind::Class, "c-1");

        let (before, after) = tokio::join!(
            cache.fetch(&k, || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("pre-write")
            }),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.invalidate(ResourceKind::Class).await;
                cache.fetch(&k, || async { Ok("post-write") }).await
            }
        );

        assert_eq!(*before.unwrap(), "pre-write");
        assert_eq!(*after.unwrap(), "post-write");
        assert!(!cache.status(&k).await.is_stale);
        assert_eq!(*cache.peek::<&'static str>(&k).await.unwrap(), "post-write");
    }

    #[tokio::test]
    async fn test_waiter_shares_fetch_that_began_after_invalidation() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let k = QueryKey::item(ResourceKind::Class, "c-1");
        cache.fetch(&k, || async { Ok(0usize) }).await.unwrap();
        cache.invalidate(ResourceKind::Class).await;

        let slow = || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
        };
        let (a, b) = tokio::join!(cache.fetch(&k, slow), cache.fetch(&k, slow));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*a.unwrap(), 1);
        assert_eq!(*b.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = QueryCache::default();
        cache
            .fetch(&QueryKey::item(ResourceKind::Subject, "s-1"), || async { Ok(()) })
            .await
            .unwrap();
        assert!(!cache.is_empty().await);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    #[tokio::test]
    async fn test_is_mutating_during_write() {
        let cache = QueryCache::default();

        let (result, during) = tokio::join!(
            cache.mutate(ResourceKind::Grade, async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(())
            }),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                (
                    cache.is_mutating(ResourceKind::Grade),
                    cache.is_mutating(ResourceKind::Class),
                )
            }
        );
        result.unwrap();
        assert_eq!(during, (true, false));
        assert!(!cache.is_mutating(ResourceKind::Grade));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let cache = QueryCache::default();
        let k = key(ResourceKind::Class, &ClassFilters::default());
        cache.fetch(&k, || async { Ok(1u8) }).await.unwrap();

        let result: Result<()> = cache
            .mutate(ResourceKind::Enrollment, async {
                Err(Error::api(Some(409), "already enrolled"))
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.status(&k).await.is_stale);
        assert!(!cache.is_mutating(ResourceKind::Enrollment));
    }
}
