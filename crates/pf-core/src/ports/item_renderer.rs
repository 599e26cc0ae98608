use crate::feed::{FeedStatus, PageNumber};

/// Pluggable presentation of feed items.
pub trait ItemRendererPort<T>: Send + Sync {
    /// Render the item at `index` within `page`.
    fn render_item(&self, page: PageNumber, index: usize, item: &T) -> anyhow::Result<()>;

    /// Render the loading / message area below the items.
    fn render_status(&self, status: &FeedStatus) -> anyhow::Result<()>;

    /// Drop everything rendered so far (the feed was reset).
    fn clear(&self) -> anyhow::Result<()>;
}
