use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use pf_core::feed::{FetchError, FilterParams, PageNumber, PageQuery, PageResult, RequestContext};
use pf_core::ports::{ClockPort, PagedQuerySourcePort};
use tracing::debug;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<PageResult<T>, FetchError>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    filter: FilterParams,
    page: PageNumber,
    page_size: u32,
}

enum CacheEntry<T> {
    InFlight(SharedFetch<T>),
    Ready {
        result: PageResult<T>,
        stored_at_ms: i64,
    },
}

enum Lookup<T> {
    Hit(PageResult<T>),
    Join(SharedFetch<T>),
    Miss,
}

/// Caching decorator for a paged query source.
///
/// - Entries are keyed by endpoint, filter, page and page size, and expire
///   `ttl` after they were stored.
/// - Identical requests issued while one is in flight await the same fetch.
/// - Failures are handed to every waiter but never stored.
///
/// 带过期时间和请求合并的分页缓存。
pub struct CachedPagedQuerySource<T> {
    inner: Arc<dyn PagedQuerySourcePort<T>>,
    clock: Arc<dyn ClockPort>,
    endpoint: String,
    ttl_ms: i64,
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
}

impl<T> CachedPagedQuerySource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `endpoint` names the wrapped source in cache keys.
    pub fn new(
        inner: Arc<dyn PagedQuerySourcePort<T>>,
        clock: Arc<dyn ClockPort>,
        endpoint: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            clock,
            endpoint: endpoint.into(),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every entry. Fetches already in flight still complete for their
    /// waiters but are not stored.
    pub fn invalidate_all(&self) {
        let mut entries = self.lock_entries();
        debug!(endpoint = %self.endpoint, dropped = entries.len(), "page cache invalidated");
        entries.clear();
    }

    /// Stored and in-flight entries.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, stored_at_ms: i64, now_ms: i64) -> bool {
        now_ms.saturating_sub(stored_at_ms) < self.ttl_ms
    }

    fn lookup(&self, key: &CacheKey) -> Lookup<T> {
        let now = self.clock.now_ms();
        match self.lock_entries().get(key) {
            Some(CacheEntry::Ready {
                result,
                stored_at_ms,
            }) if self.is_fresh(*stored_at_ms, now) => Lookup::Hit(result.clone()),
            Some(CacheEntry::InFlight(fetch)) => Lookup::Join(fetch.clone()),
            _ => Lookup::Miss,
        }
    }

    fn start_fetch(
        &self,
        key: CacheKey,
        context: &RequestContext,
        query: &PageQuery,
    ) -> SharedFetch<T> {
        let mut entries = self.lock_entries();
        // Another caller may have started the same fetch since the lookup.
        if let Some(CacheEntry::InFlight(fetch)) = entries.get(&key) {
            return fetch.clone();
        }

        let now = self.clock.now_ms();
        let before = entries.len();
        entries.retain(|_, entry| match entry {
            CacheEntry::Ready { stored_at_ms, .. } => self.is_fresh(*stored_at_ms, now),
            CacheEntry::InFlight(_) => true,
        });
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "expired pages evicted");
        }

        let inner = Arc::clone(&self.inner);
        let context = context.clone();
        let query = query.clone();
        let fetch = async move { inner.fetch_page(&context, &query).await }
            .boxed()
            .shared();
        entries.insert(key, CacheEntry::InFlight(fetch.clone()));
        fetch
    }

    fn finish_fetch(
        &self,
        key: CacheKey,
        fetch: &SharedFetch<T>,
        outcome: &Result<PageResult<T>, FetchError>,
    ) {
        let mut entries = self.lock_entries();
        let owns_entry = matches!(
            entries.get(&key),
            Some(CacheEntry::InFlight(live)) if live.ptr_eq(fetch)
        );
        if !owns_entry {
            return;
        }

        match outcome {
            Ok(result) => {
                entries.insert(
                    key,
                    CacheEntry::Ready {
                        result: result.clone(),
                        stored_at_ms: self.clock.now_ms(),
                    },
                );
            }
            Err(_) => {
                entries.remove(&key);
            }
        }
    }
}

#[async_trait]
impl<T> PagedQuerySourcePort<T> for CachedPagedQuerySource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn fetch_page(
        &self,
        context: &RequestContext,
        query: &PageQuery,
    ) -> Result<PageResult<T>, FetchError> {
        let key = CacheKey {
            endpoint: self.endpoint.clone(),
            filter: query.filter.clone(),
            page: query.page,
            page_size: query.page_size,
        };

        let fetch = match self.lookup(&key) {
            Lookup::Hit(result) => {
                debug!(page = query.page, filter = %query.filter, "page cache hit");
                return Ok(result);
            }
            Lookup::Join(fetch) => {
                debug!(page = query.page, filter = %query.filter, "joining in-flight page fetch");
                fetch
            }
            Lookup::Miss => {
                debug!(page = query.page, filter = %query.filter, "page cache miss");
                self.start_fetch(key.clone(), context, query)
            }
        };

        let outcome = fetch.clone().await;
        self.finish_fetch(key, &fetch, &outcome);
        outcome
    }
}
