//! HTTP paged query source.

mod dto;
mod paged_source;

pub use paged_source::{HttpPagedQuerySource, HttpSourceConfig};
