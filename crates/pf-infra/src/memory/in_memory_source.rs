use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pf_core::feed::{FetchError, PageQuery, PageResult, Paginator, RequestContext};
use pf_core::ports::PagedQuerySourcePort;
use tracing::trace;

/// Paged source over a fixed collection, sliced the way the poll API slices.
///
/// The filter is not interpreted: every query pages the same collection. A
/// page past the end resolves to the last page. The empty message accompanies
/// an empty collection, the end message the last page of a non-empty one.
pub struct InMemoryPagedSource<T> {
    items: Arc<[T]>,
    empty_message: Option<String>,
    end_message: Option<String>,
    latency: Option<Duration>,
}

impl<T> InMemoryPagedSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::from(items),
            empty_message: None,
            end_message: None,
            latency: None,
        }
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = Some(message.into());
        self
    }

    pub fn with_end_message(mut self, message: impl Into<String>) -> Self {
        self.end_message = Some(message.into());
        self
    }

    /// Delay every response, to make the window's concurrency observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> InMemoryPagedSource<T> {
    fn page(&self, query: &PageQuery) -> PageResult<T> {
        let page_size = query.page_size.max(1);
        let paginator = Paginator::for_page(query.page, self.items.len() as u64, page_size);

        let start = (paginator.page as usize - 1).saturating_mul(page_size as usize);
        let end = start.saturating_add(page_size as usize).min(self.items.len());
        let items = self.items.get(start..end).unwrap_or_default().to_vec();

        let message = if paginator.total_items == 0 {
            self.empty_message.clone()
        } else if !paginator.has_next {
            self.end_message.clone()
        } else {
            None
        };

        PageResult {
            items,
            paginator,
            message,
        }
    }
}

#[async_trait]
impl<T> PagedQuerySourcePort<T> for InMemoryPagedSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn fetch_page(
        &self,
        _context: &RequestContext,
        query: &PageQuery,
    ) -> Result<PageResult<T>, FetchError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = self.page(query);
        trace!(
            requested = query.page,
            served = result.paginator.page,
            items = result.items.len(),
            "in-memory page served"
        );
        Ok(result)
    }
}
