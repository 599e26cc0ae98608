//! Windowed pagination domain.
//!
//! ```text
//! viewport (enter/leave) ──▶ VisibilityTracker ──▶ WindowEvent::Visible
//!                                                        │
//!                      WindowStateMachine::transition ◀──┘
//!                         │                  ▲
//!            WindowAction::FetchPage         │ WindowEvent::PageSettled
//!                         ▼                  │
//!                  PagedQuerySourcePort ─────┘
//! ```

mod error;
mod model;
mod slots;
mod snapshot;
mod status;
pub mod visibility;
pub mod window;

pub use error::{FetchError, PaginatorError};
pub use model::{FilterParams, PageNumber, PageQuery, PageResult, Paginator, RequestContext};
pub use slots::PageSlots;
pub use snapshot::{FeedSnapshot, RenderedPage};
pub use status::{FeedStatus, StatusIcon};
pub use visibility::{crosses_midpoint, PageElementId, VisibilityTracker};
pub use window::{
    PageBounds, PageRequest, WindowAction, WindowEvent, WindowPhase, WindowRound, WindowSlot,
    WindowState, WindowStateMachine, WindowTag,
};
