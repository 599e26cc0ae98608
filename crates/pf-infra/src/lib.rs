pub mod cache;
pub mod http;
pub mod memory;
pub mod time;

pub use cache::CachedPagedQuerySource;
pub use http::{HttpPagedQuerySource, HttpSourceConfig};
pub use memory::InMemoryPagedSource;
pub use time::SystemClock;
