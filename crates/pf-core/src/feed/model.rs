use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::PaginatorError;

/// 1-based page number.
pub type PageNumber = u32;

/// Opaque key set selecting which collection is being paged.
///
/// Two filters are equal when they carry the same keys with the same values;
/// the engine resets its window whenever the live filter changes.
///
/// 选择分页集合的不透明键集合。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, String>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// One page request against a paged collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub filter: FilterParams,
    pub page: PageNumber,
    pub page_size: u32,
}

impl PageQuery {
    pub fn new(filter: FilterParams, page: PageNumber, page_size: u32) -> Self {
        Self {
            filter,
            page,
            page_size,
        }
    }
}

/// Server-supplied position of a page within the full collection.
///
/// 服务端返回的分页元数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    pub page: PageNumber,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl Paginator {
    /// Builds the paginator for `page` of a collection with `total_items` items.
    ///
    /// A page number outside `1..=total_pages` resolves to the last page, and an
    /// empty collection still has one (empty) page.
    pub fn for_page(page: PageNumber, total_items: u64, page_size: u32) -> Self {
        let page_size = u64::from(page_size.max(1));
        let total_pages = total_items.div_ceil(page_size).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        let page = if page == 0 || page > total_pages {
            total_pages
        } else {
            page
        };

        Self {
            page,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }

    /// Checks the paginator invariants.
    ///
    /// - `has_previous == (page > 1)`
    /// - `has_next == (page < total_pages)`
    /// - an empty collection spans exactly one page
    pub fn validate(&self) -> Result<(), PaginatorError> {
        if self.page == 0 {
            return Err(PaginatorError::PageZero);
        }
        if self.total_pages == 0 {
            return Err(PaginatorError::NoPages);
        }
        if self.page > self.total_pages {
            return Err(PaginatorError::PageOutOfRange {
                page: self.page,
                total_pages: self.total_pages,
            });
        }
        if self.total_items == 0 && self.total_pages != 1 {
            return Err(PaginatorError::EmptyCollectionSpansPages(self.total_pages));
        }
        if self.has_previous != (self.page > 1) {
            return Err(PaginatorError::PreviousFlagMismatch { page: self.page });
        }
        if self.has_next != (self.page < self.total_pages) {
            return Err(PaginatorError::NextFlagMismatch {
                page: self.page,
                total_pages: self.total_pages,
            });
        }
        Ok(())
    }
}

/// One resolved page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub paginator: Paginator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, paginator: Paginator) -> Self {
        Self {
            items,
            paginator,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Pre-resolved request context passed with every fetch.
///
/// Session state lives outside the engine; callers hand in the token they
/// resolved so the engine never reads ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub auth_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
        }
    }

    /// `Authorization` header value for authenticated requests.
    pub fn authorization_header(&self) -> Option<String> {
        self.auth_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| format!("Token {token}"))
    }
}
