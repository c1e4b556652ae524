use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sieve_cache::SieveCache;
use tokio::time::Instant;

use crate::{QueryCachePolicy, QueryError, QueryPage, QueryRequest, RecordStore};

#[derive(Clone)]
struct CachedPage {
    page: Arc<QueryPage>,
    fetched_at: Instant,
}

#[derive(Default)]
struct Issued {
    latest: u64,
    in_flight: usize,
}

/// Tracks the latest generation issued per cache key.
#[derive(Default)]
struct Generations {
    next: AtomicU64,
    issued: Mutex<HashMap<String, Issued>>,
}

impl Generations {
    fn issue(self: &Arc<Self>, key: &str) -> GenerationGuard {
        let generation = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let mut issued = self.issued.lock();
        let entry = issued.entry(key.to_owned()).or_default();
        entry.latest = generation;
        entry.in_flight += 1;

        GenerationGuard {
            generations: Arc::clone(self),
            key: key.to_owned(),
            generation,
        }
    }
}

/// Marks one request as in flight until dropped.
struct GenerationGuard {
    generations: Arc<Generations>,
    key: String,
    generation: u64,
}

impl GenerationGuard {
    /// The latest generation issued for this guard's key
    fn latest(&self) -> u64 {
        self.generations
            .issued
            .lock()
            .get(&self.key)
            .map(|issued| issued.latest)
            .unwrap_or(self.generation)
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut issued = self.generations.issued.lock();
        if let Some(entry) = issued.get_mut(&self.key) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            if entry.in_flight == 0 {
                issued.remove(&self.key);
            }
        }
    }
}

/// Runs paginated queries against a [`RecordStore`], caching pages.
///
/// Pages are cached under the canonical form of every request parameter, in a
/// capacity-bounded SIEVE cache, for [`QueryCachePolicy::stale_after`].
///
/// Every request that reaches the store is assigned a generation. When a
/// response arrives after a newer request for the same parameters was issued,
/// it is discarded and reported as [`QueryError::Superseded`], so an older
/// response can never overwrite a newer one.
///
/// Clones share the same cache.
pub struct QueryExecutor<S> {
    store: Arc<S>,
    policy: QueryCachePolicy,
    cache: Arc<Mutex<SieveCache<String, CachedPage>>>,
    generations: Arc<Generations>,
}

impl<S> Clone for QueryExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            cache: Arc::clone(&self.cache),
            generations: Arc::clone(&self.generations),
        }
    }
}

impl<S> std::fmt::Debug for QueryExecutor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("policy", &self.policy)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl<S> QueryExecutor<S>
where
    S: RecordStore,
{
    /// Front `store` with a page cache
    pub fn new(store: S, policy: QueryCachePolicy) -> Result<Self, QueryError> {
        Ok(Self {
            store: Arc::new(store),
            policy,
            cache: Arc::new(Mutex::new(Self::empty_cache(policy)?)),
            generations: Arc::default(),
        })
    }

    fn empty_cache(policy: QueryCachePolicy) -> Result<SieveCache<String, CachedPage>, QueryError> {
        SieveCache::new(policy.capacity).map_err(|error| QueryError::CacheUnavailable {
            reason: error.to_string(),
        })
    }

    /// The store queries are sent to
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch one page, from the cache when a fresh copy is held.
    pub async fn query(&self, request: QueryRequest) -> Result<Arc<QueryPage>, QueryError> {
        let key = request.cache_key().map_err(|e| QueryError::Encode {
            resource: request.resource.clone(),
            reason: e.to_string(),
        })?;

        if let Some(cached) = self.cache.lock().get(&key) {
            if cached.fetched_at.elapsed() < self.policy.stale_after {
                tracing::debug!(resource = %request.resource, page = request.page, "serving cached page");
                return Ok(Arc::clone(&cached.page));
            }
        }

        let guard = self.generations.issue(&key);
        let generation = guard.generation;
        tracing::debug!(resource = %request.resource, page = request.page, generation, "querying record store");

        let result = self.store.filter(&request).await;

        let latest = guard.latest();
        if latest != generation {
            tracing::warn!(
                resource = %request.resource,
                generation,
                latest,
                "discarding superseded query response"
            );
            return Err(QueryError::Superseded { generation, latest });
        }

        let page = Arc::new(result?);
        self.cache.lock().insert(
            key,
            CachedPage {
                page: Arc::clone(&page),
                fetched_at: Instant::now(),
            },
        );
        Ok(page)
    }

    /// Drop every cached page, e.g. after a mutation
    pub fn invalidate(&self) {
        match Self::empty_cache(self.policy) {
            Ok(cache) => *self.cache.lock() = cache,
            Err(error) => tracing::warn!(%error, "could not reset page cache"),
        }
    }
}
