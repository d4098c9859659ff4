//! Cached reads and invalidating writes over the resource API
//!
//! ## Structure
//! - `key.rs` - Cache keys compared by filter value
//! - `graph.rs` - Which namespaces a write invalidates
//! - `cache.rs` - Entries, de-duplication, status and write tracking
//! - `poller.rs` - Periodic refetch loop
//!
//! [`Queries`] ties a [`ResourceApi`] backend to a [`QueryCache`]. Reads go
//! through the cache; writes go straight to the backend and invalidate the
//! written namespace (plus its dependents) once they succeed.

pub mod cache;
pub mod graph;
pub mod key;
pub mod poller;

use std::marker::PhantomData;
use std::sync::Arc;

pub use cache::{CachePolicy, QueryCache, QueryStatus, RECOMMENDATION_POLL_INTERVAL};
pub use graph::InvalidationGraph;
pub use key::{canonical_json, QueryKey, QueryScope};
pub use poller::Poller;

use crate::api::{Resource, ResourceApi};
use crate::error::Result;
use crate::models::{ListFilters, Page};

/// Query layer over one backend
pub struct Queries<B: ResourceApi> {
    backend: B,
    cache: QueryCache,
}

impl<B: ResourceApi> Queries<B> {
    pub fn new(backend: B) -> Self {
        Self::with_cache(backend, QueryCache::default())
    }

    pub fn with_cache(backend: B, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Reads and writes for one resource
    pub fn resource<R: Resource>(&self) -> ResourceQueries<'_, B, R> {
        ResourceQueries {
            queries: self,
            _resource: PhantomData,
        }
    }
}

/// Cached access to one resource
pub struct ResourceQueries<'q, B: ResourceApi, R: Resource> {
    queries: &'q Queries<B>,
    _resource: PhantomData<R>,
}

impl<'q, B: ResourceApi, R: Resource> ResourceQueries<'q, B, R> {
    pub fn list_key(&self, filters: &R::Filters) -> Result<QueryKey> {
        QueryKey::list(R::KIND, filters)
    }

    pub fn item_key(&self, id: &str) -> QueryKey {
        QueryKey::item(R::KIND, id)
    }

    /// Cached list read
    ///
    /// Invalid filters fail before a cache entry is created.
    pub async fn list(&self, filters: &R::Filters) -> Result<Arc<Page<R::Item>>> {
        filters.validate()?;
        let key = self.list_key(filters)?;
        let backend = &self.queries.backend;
        self.queries
            .cache
            .fetch(&key, || backend.list::<R>(filters))
            .await
    }

    /// Cached single-entity read
    pub async fn get(&self, id: &str) -> Result<Arc<R::Item>> {
        let key = self.item_key(id);
        let backend = &self.queries.backend;
        self.queries.cache.fetch(&key, || backend.get::<R>(id)).await
    }

    /// Force the next [`list`](Self::list) for these filters to hit the backend
    pub async fn invalidate_list(&self, filters: &R::Filters) -> Result<()> {
        let key = self.list_key(filters)?;
        self.queries.cache.invalidate_key(&key).await;
        Ok(())
    }

    /// Refetch regardless of freshness
    pub async fn refetch(&self, filters: &R::Filters) -> Result<Arc<Page<R::Item>>> {
        self.invalidate_list(filters).await?;
        self.list(filters).await
    }

    pub async fn list_status(&self, filters: &R::Filters) -> Result<QueryStatus> {
        let key = self.list_key(filters)?;
        Ok(self.queries.cache.status(&key).await)
    }

    pub async fn item_status(&self, id: &str) -> QueryStatus {
        self.queries.cache.status(&self.item_key(id)).await
    }

    pub async fn create(&self, dto: &R::Create) -> Result<R::Item> {
        self.queries
            .cache
            .mutate(R::KIND, self.queries.backend.create::<R>(dto))
            .await
    }

    pub async fn update(&self, id: &str, dto: &R::Update) -> Result<R::Item> {
        self.queries
            .cache
            .mutate(R::KIND, self.queries.backend.update::<R>(id, dto))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.queries
            .cache
            .mutate(R::KIND, self.queries.backend.delete::<R>(id))
            .await
    }

    pub fn is_mutating(&self) -> bool {
        self.queries.cache.is_mutating(R::KIND)
    }
}
