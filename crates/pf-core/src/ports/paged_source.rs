use async_trait::async_trait;

use crate::feed::{FetchError, PageQuery, PageResult, RequestContext};

/// Page-numbered remote collection.
///
/// Implementations may answer from a cache and are expected to de-duplicate
/// identical concurrent requests themselves; the engine issues requests freely.
///
/// 分页查询数据源。
#[async_trait]
pub trait PagedQuerySourcePort<T>: Send + Sync {
    /// Fetch one page of the collection selected by `query.filter`.
    async fn fetch_page(
        &self,
        context: &RequestContext,
        query: &PageQuery,
    ) -> Result<PageResult<T>, FetchError>;
}
