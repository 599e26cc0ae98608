use std::collections::BTreeMap;
use std::sync::Arc;

use super::model::PageNumber;

/// Arena of merged pages keyed by page number.
///
/// Pages may resolve out of order, so the arena is sparse; only the gap-free
/// prefix starting at page 1 is ever exposed to renderers.
///
/// 按页码存放已合并页面的稀疏映射，只暴露从第 1 页开始的连续前缀。
#[derive(Debug, Clone)]
pub struct PageSlots<T> {
    slots: BTreeMap<PageNumber, Arc<[T]>>,
}

impl<T> Default for PageSlots<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T> PageSlots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the slot for `page`.
    ///
    /// Returns `false` when the slot already held the same items, so callers can
    /// skip notifying observers.
    pub fn insert(&mut self, page: PageNumber, items: Vec<T>) -> bool
    where
        T: PartialEq,
    {
        if let Some(existing) = self.slots.get(&page) {
            if existing[..] == items[..] {
                return false;
            }
        }
        self.slots.insert(page, Arc::from(items));
        true
    }

    pub fn get(&self, page: PageNumber) -> Option<&[T]> {
        self.slots.get(&page).map(|items| &items[..])
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        self.slots.contains_key(&page)
    }

    /// Number of populated slots, exposed or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Highest page `k` such that pages `1..=k` are all populated (0 if page 1 is missing).
    pub fn contiguous_len(&self) -> PageNumber {
        let mut expected = 1;
        for page in self.slots.keys() {
            if *page != expected {
                break;
            }
            expected += 1;
        }
        expected - 1
    }

    /// Pages of the gap-free prefix, in page order.
    pub fn exposed_pages(&self) -> impl Iterator<Item = (PageNumber, &Arc<[T]>)> {
        let limit = self.contiguous_len() as usize;
        self.slots
            .iter()
            .take(limit)
            .map(|(page, items)| (*page, items))
    }

    /// Items of the gap-free prefix, in page order.
    pub fn contiguous_items(&self) -> impl Iterator<Item = &T> {
        self.exposed_pages().flat_map(|(_, items)| items.iter())
    }

    pub fn exposed_item_count(&self) -> usize {
        self.exposed_pages().map(|(_, items)| items.len()).sum()
    }
}
