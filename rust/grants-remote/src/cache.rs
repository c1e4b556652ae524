use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use grants_tree::GrantTree;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::{GrantCacheError, GrantCachePolicy, GrantResponse, GrantSource};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<GrantTree>, GrantCacheError>>>;

/// A tree together with the tag it was served with. Swapped as a unit.
#[derive(Debug)]
struct CacheEntry {
    tree: Arc<GrantTree>,
    tag: Option<String>,
    validated_at: Instant,
}

impl CacheEntry {
    fn age(&self) -> std::time::Duration {
        self.validated_at.elapsed()
    }
}

/// The fetch callers currently join. Only valid for the epoch it started in.
struct InFlight {
    id: u64,
    epoch: u64,
    forced: bool,
    fetch: SharedFetch,
}

struct Inner<S> {
    source: Arc<S>,
    policy: GrantCachePolicy,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    in_flight: Mutex<Option<InFlight>>,
    epoch: AtomicU64,
    next_fetch: AtomicU64,
}

impl<S> Inner<S> {
    fn entry_younger_than(&self, age: std::time::Duration) -> Option<Arc<CacheEntry>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.age() < age)
            .cloned()
    }

    fn install(&self, epoch: u64, tree: &Arc<GrantTree>, tag: Option<String>) {
        let mut entry = self.entry.write();
        if self.epoch.load(Ordering::SeqCst) == epoch {
            *entry = Some(Arc::new(CacheEntry {
                tree: Arc::clone(tree),
                tag,
                validated_at: Instant::now(),
            }));
            tracing::debug!(systems = tree.systems.len(), "installed grant tree");
        } else {
            tracing::debug!("discarding grant tree fetched before invalidation");
        }
    }

    /// Restart the staleness clock of `held` if it is still the cached entry
    fn touch(&self, epoch: u64, held: &Arc<CacheEntry>) {
        let mut entry = self.entry.write();
        let unchanged = entry
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, held));
        if unchanged && self.epoch.load(Ordering::SeqCst) == epoch {
            *entry = Some(Arc::new(CacheEntry {
                tree: Arc::clone(&held.tree),
                tag: held.tag.clone(),
                validated_at: Instant::now(),
            }));
            tracing::debug!("grant tree revalidated");
        }
    }

    fn finish(&self, id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.as_ref().is_some_and(|current| current.id == id) {
            *in_flight = None;
        }
    }
}

/// Holds the caller's grant tree and keeps it current.
///
/// The cache serves a fresh tree from memory, revalidates a stale one with a
/// conditional request, and collapses concurrent fetches into a single
/// request. It never substitutes an empty tree for one it could not obtain:
/// failures are returned to the caller, who decides how to degrade (usually
/// with [`grants_tree::GrantResolver::deny_all`]).
///
/// Each fetch is spawned on the current tokio runtime and only holds a weak
/// reference to the cache. It completes even when every caller waiting on it
/// goes away, and it never keeps a dropped cache alive.
///
/// Clones share the same cache.
///
/// # Examples
///
/// ```
/// use grants_remote::{GrantCachePolicy, GrantTreeCache, MemoryGrantSource};
/// use grants_tree::GrantTree;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MemoryGrantSource::new(GrantTree::empty());
/// let cache = GrantTreeCache::new(source.clone(), GrantCachePolicy::default());
///
/// let first = cache.fetch(false).await?;
/// let second = cache.fetch(false).await?;
/// assert_eq!(first, second);
/// assert_eq!(source.requests(), 1);
/// # Ok(())
/// # }
/// ```
pub struct GrantTreeCache<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for GrantTreeCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for GrantTreeCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantTreeCache")
            .field("policy", &self.inner.policy)
            .field("entry", &*self.inner.entry.read())
            .field("epoch", &self.inner.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

impl<S> GrantTreeCache<S>
where
    S: GrantSource + 'static,
{
    /// Create an empty cache in front of `source`
    pub fn new(source: S, policy: GrantCachePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Arc::new(source),
                policy,
                entry: RwLock::new(None),
                in_flight: Mutex::new(None),
                epoch: AtomicU64::new(0),
                next_fetch: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain the grant tree.
    ///
    /// Without `force`, a fresh tree is served from memory and a stale one is
    /// revalidated with its tag. With `force`, the service is asked for a
    /// complete tree.
    ///
    /// Calls made while a fetch is in flight wait for that fetch and receive
    /// its outcome, except that a forced call never settles for a conditional
    /// fetch: it runs one forced fetch after it instead.
    pub async fn fetch(&self, force: bool) -> Result<Arc<GrantTree>, GrantCacheError> {
        if !force {
            if let Some(entry) = self.inner.entry_younger_than(self.inner.policy.stale_after) {
                tracing::debug!(age = ?entry.age(), "serving fresh grant tree");
                return Ok(Arc::clone(&entry.tree));
            }
        }

        self.join_or_start(force).await
    }

    /// The retained tree, fresh or stale, without any I/O
    pub fn cached(&self) -> Option<Arc<GrantTree>> {
        self.inner
            .entry_younger_than(self.inner.policy.retain_for)
            .map(|entry| Arc::clone(&entry.tree))
    }

    /// Obtain the grant tree, preferring a quick answer over a current one.
    ///
    /// A fresh tree is returned as is. A stale but retained tree is returned
    /// immediately while a revalidation runs in the background. Without a
    /// retained tree this waits for a fetch.
    pub async fn current(&self) -> Result<Arc<GrantTree>, GrantCacheError> {
        let policy = self.inner.policy;
        match self.inner.entry_younger_than(policy.retain_for) {
            Some(entry) if entry.age() < policy.stale_after => Ok(Arc::clone(&entry.tree)),
            Some(entry) => {
                tracing::debug!(age = ?entry.age(), "serving stale grant tree while revalidating");
                self.revalidate_in_background();
                Ok(Arc::clone(&entry.tree))
            }
            None => self.fetch(false).await,
        }
    }

    /// Forget the held tree and its tag, e.g. on logout.
    ///
    /// A fetch in flight across this call still answers the callers already
    /// waiting on it, but later calls do not join it and its result does not
    /// repopulate the cache.
    pub fn invalidate(&self) {
        let mut in_flight = self.inner.in_flight.lock();
        let mut entry = self.inner.entry.write();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *entry = None;
        *in_flight = None;
        tracing::debug!("grant tree invalidated");
    }

    fn revalidate_in_background(&self) {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(error) = cache.join_or_start(false).await {
                tracing::warn!(%error, "background grant revalidation failed");
            }
        });
    }

    fn join_or_start(&self, force: bool) -> SharedFetch {
        let mut in_flight = self.inner.in_flight.lock();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);

        let previous = match in_flight.as_ref() {
            Some(current) if current.epoch == epoch && (current.forced || !force) => {
                tracing::debug!(force, "joining grant fetch in flight");
                return current.fetch.clone();
            }
            Some(current) if current.epoch == epoch => {
                tracing::debug!("queueing forced grant fetch behind a conditional one");
                Some(current.fetch.clone())
            }
            _ => None,
        };

        let id = self.inner.next_fetch.fetch_add(1, Ordering::SeqCst);
        let cache = Arc::downgrade(&self.inner);
        let source = Arc::clone(&self.inner.source);
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let result = load(&cache, source.as_ref(), epoch, force).await;
            if let Some(inner) = cache.upgrade() {
                inner.finish(id);
            }
            result
        });

        let fetch = async move {
            task.await.unwrap_or_else(|error| {
                Err(GrantCacheError::FetchFailed {
                    reason: error.to_string(),
                })
            })
        }
        .boxed()
        .shared();

        *in_flight = Some(InFlight {
            id,
            epoch,
            forced: force,
            fetch: fetch.clone(),
        });
        fetch
    }
}

async fn load<S: GrantSource>(
    cache: &Weak<Inner<S>>,
    source: &S,
    epoch: u64,
    force: bool,
) -> Result<Arc<GrantTree>, GrantCacheError> {
    let held = cache
        .upgrade()
        .and_then(|inner| inner.entry_younger_than(inner.policy.retain_for));
    let tag = if force {
        None
    } else {
        held.as_ref().and_then(|entry| entry.tag.clone())
    };

    match source.fetch(force, tag.as_deref()).await? {
        GrantResponse::Full { tree, tag } => install(cache, epoch, tree, tag),
        GrantResponse::NotModified => match held {
            Some(entry) => {
                if let Some(inner) = cache.upgrade() {
                    inner.touch(epoch, &entry);
                }
                Ok(Arc::clone(&entry.tree))
            }
            None => {
                tracing::warn!("grant service answered not-modified without a cached tree; refetching");
                match source.fetch(true, None).await? {
                    GrantResponse::Full { tree, tag } => install(cache, epoch, tree, tag),
                    GrantResponse::NotModified => Err(GrantCacheError::NotModifiedWithoutCache),
                }
            }
        },
    }
}

fn install<S>(
    cache: &Weak<Inner<S>>,
    epoch: u64,
    tree: GrantTree,
    tag: Option<String>,
) -> Result<Arc<GrantTree>, GrantCacheError> {
    tree.validate()?;
    let tree = Arc::new(tree);
    if let Some(inner) = cache.upgrade() {
        inner.install(epoch, &tree, tag);
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use grants_tree::GrantResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    use crate::MemoryGrantSource;

    fn tree(code: &str) -> GrantTree {
        serde_json::from_value(json!({ "systems": [
            { "systemId": "S1", "sections": [
                { "systemSectionId": "sec-1", "actions": [
                    { "systemSectionActionId": "A1", "code": code, "effect": "ALLOW" }
                ]}
            ]}
        ]}))
        .unwrap()
    }

    fn cache(source: &MemoryGrantSource) -> GrantTreeCache<MemoryGrantSource> {
        GrantTreeCache::new(source.clone(), GrantCachePolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn it_serves_a_fresh_tree_from_memory() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        let cache = cache(&source);

        let first = cache.fetch(false).await?;
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache.fetch(false).await?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.requests(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn it_keeps_the_tree_when_not_modified() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        let cache = cache(&source);

        let first = cache.fetch(false).await?;
        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        let second = cache.fetch(false).await?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.requests(), 2);

        let third = cache.fetch(false).await?;
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(source.requests(), 2, "a 304 restarts the staleness clock");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn it_replaces_the_tree_when_modified() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        let cache = cache(&source);

        cache.fetch(false).await?;
        source.publish(tree("update"));
        let replaced = cache.fetch(true).await?;

        let resolver = GrantResolver::new(replaced);
        assert!(resolver.can_perform_action("update", None));
        assert!(!resolver.can_perform_action("create", None));
        assert_eq!(source.forced_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_collapses_concurrent_fetches() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(50));
        let cache = cache(&source);

        let (a, b, c) = tokio::join!(cache.fetch(false), cache.fetch(false), cache.fetch(false));

        assert!(Arc::ptr_eq(&a?, &b?));
        assert!(c.is_ok());
        assert_eq!(source.requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_joins_a_forced_fetch_in_flight() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(50));
        let cache = cache(&source);

        let (a, b, c) = tokio::join!(cache.fetch(true), cache.fetch(true), cache.fetch(false));

        assert!(Arc::ptr_eq(&a?, &b?));
        assert!(c.is_ok());
        assert_eq!(source.requests(), 1);
        assert_eq!(source.forced_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_queues_a_forced_fetch_behind_a_conditional_one() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(20));
        let cache = cache(&source);

        let (conditional, forced, joined) =
            tokio::join!(cache.fetch(false), cache.fetch(true), cache.fetch(false));

        assert!(conditional.is_ok());
        assert!(Arc::ptr_eq(&forced?, &joined?));
        assert_eq!(source.requests(), 2);
        assert_eq!(source.forced_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_shares_failures_with_every_waiter() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(20));
        source.script(Err(GrantCacheError::FetchFailed {
            reason: "offline".into(),
        }));
        let cache = cache(&source);

        let (a, b) = tokio::join!(cache.fetch(false), cache.fetch(false));

        assert_eq!(a, b);
        assert!(matches!(a, Err(GrantCacheError::FetchFailed { .. })));
        assert!(cache.cached().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn it_refetches_once_on_not_modified_without_a_tree() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        source.script(Ok(GrantResponse::NotModified));
        let cache = cache(&source);

        let tree = cache.fetch(false).await?;

        assert_eq!(tree.systems.len(), 1);
        assert_eq!(source.requests(), 2);
        assert_eq!(source.forced_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_instead_of_serving_an_empty_tree() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        source.script(Ok(GrantResponse::NotModified));
        source.script(Ok(GrantResponse::NotModified));
        let cache = cache(&source);

        let result = cache.fetch(false).await;

        assert_eq!(result, Err(GrantCacheError::NotModifiedWithoutCache));
        assert_eq!(source.requests(), 2);
        assert!(cache.cached().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_invalid_trees() -> TestResult {
        let source = MemoryGrantSource::new(serde_json::from_value(json!({
            "systems": [{ "systemId": "S1" }, { "systemId": "S1" }]
        }))?);
        let cache = cache(&source);

        assert!(matches!(
            cache.fetch(false).await,
            Err(GrantCacheError::InvalidTree(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn it_does_not_repopulate_after_invalidation() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(50));
        let cache = cache(&source);

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(false).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate();

        assert!(pending.await?.is_ok());
        assert!(cache.cached().is_none());

        cache.fetch(false).await?;
        assert!(cache.cached().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn it_forces_a_new_request_after_invalidation() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(50));
        let cache = cache(&source);

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(false).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate();

        let forced = cache.fetch(true).await?;

        assert_eq!(source.requests(), 2);
        assert_eq!(source.forced_requests(), 1);
        assert!(pending.await?.is_ok());

        let cached = cache.cached().expect("tree from the forced fetch");
        assert!(Arc::ptr_eq(&cached, &forced));
        Ok(())
    }

    #[tokio::test]
    async fn it_finishes_a_fetch_abandoned_by_every_waiter() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(50));
        let cache = cache(&source);

        let waiter = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(false).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter.abort();
        assert!(waiter.await.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.cached().is_some());
        assert!(cache.inner.in_flight.lock().is_none());

        cache.fetch(false).await?;
        assert_eq!(source.requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_releases_the_cache_while_a_fetch_is_in_flight() -> TestResult {
        let source = MemoryGrantSource::new(tree("create")).with_latency(Duration::from_millis(20));
        let cache = cache(&source);

        let pending = cache.join_or_start(false);
        let inner = Arc::downgrade(&cache.inner);
        drop(pending);
        drop(cache);
        assert!(inner.upgrade().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.requests(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn it_serves_stale_trees_while_revalidating() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        let cache = cache(&source);

        cache.fetch(false).await?;
        source.publish(tree("update"));
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        let stale = cache.current().await?;
        assert!(GrantResolver::new(stale).can_perform_action("create", None));

        tokio::task::yield_now().await;
        let mut attempts = 0;
        while source.requests() < 2 && attempts < 20 {
            tokio::task::yield_now().await;
            attempts += 1;
        }

        let refreshed = cache.cached().expect("revalidated tree");
        assert!(GrantResolver::new(refreshed).can_perform_action("update", None));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn it_stops_serving_trees_past_retention() -> TestResult {
        let source = MemoryGrantSource::new(tree("create"));
        let cache = cache(&source);

        cache.fetch(false).await?;
        tokio::time::advance(Duration::from_secs(11 * 60)).await;

        assert!(cache.cached().is_none());
        cache.current().await?;
        assert_eq!(source.requests(), 2);
        assert_eq!(source.forced_requests(), 0);
        Ok(())
    }
}
