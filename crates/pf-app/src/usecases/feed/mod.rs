//! Feed use cases.
//!
//! This module exposes the feed orchestrator and the viewport adapter that
//! feeds visibility callbacks into it.

mod context;
pub mod orchestrator;
pub mod viewport;

pub use orchestrator::{FeedOrchestrator, FeedOrchestratorError};
pub use viewport::FeedViewport;
