//! # pf-core
//!
//! Core domain models and business logic for PollFeed.
//!
//! This crate contains the windowed pagination engine as a pure state machine,
//! together with the ports the application layer drives. It has no runtime or
//! network dependencies.

pub mod config;
pub mod feed;
pub mod poll;
pub mod ports;

// Re-export commonly used types at the crate root
pub use config::FeedConfig;
pub use feed::{
    FeedSnapshot, FeedStatus, FetchError, FilterParams, PageBounds, PageNumber, PageQuery,
    PageResult, PageSlots, Paginator, RequestContext, StatusIcon, WindowAction, WindowEvent,
    WindowState, WindowStateMachine, WindowTag,
};
pub use poll::{PollFeed, PollListItem};
