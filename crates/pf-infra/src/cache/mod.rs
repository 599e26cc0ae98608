//! Page cache.

mod cached_source;

pub use cached_source::CachedPagedQuerySource;
