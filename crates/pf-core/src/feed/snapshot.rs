use std::sync::Arc;

use super::model::PageNumber;
use super::status::FeedStatus;
use super::window::{PageBounds, WindowState};

/// Items of one exposed page, shared with the engine's slot arena.
#[derive(Debug, Clone)]
pub struct RenderedPage<T> {
    pub page: PageNumber,
    pub items: Arc<[T]>,
}

/// Observer-facing view of a feed: the exposed pages and the status.
///
/// 暴露给观察者的列表快照。
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    /// Bumped every time the observable state changes.
    pub revision: u64,
    pub current_page: PageNumber,
    pub bounds: PageBounds,
    pub pages: Vec<RenderedPage<T>>,
    pub status: FeedStatus,
}

impl<T> FeedSnapshot<T> {
    pub fn empty() -> Self {
        Self {
            revision: 0,
            current_page: 1,
            bounds: PageBounds::default(),
            pages: Vec::new(),
            status: FeedStatus::Loading,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }
}

impl<T> From<&WindowState<T>> for FeedSnapshot<T> {
    fn from(state: &WindowState<T>) -> Self {
        Self {
            revision: state.revision(),
            current_page: state.current_page(),
            bounds: state.bounds(),
            pages: state
                .slots()
                .exposed_pages()
                .map(|(page, items)| RenderedPage {
                    page,
                    items: Arc::clone(items),
                })
                .collect(),
            status: state.status().clone(),
        }
    }
}
