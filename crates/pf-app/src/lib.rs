//! PollFeed Application Orchestration Layer
//!
//! This crate contains the feed use cases: the orchestrator that runs the
//! window state machine against a paged query source, and the renderer use
//! case that pushes exposed items to an item renderer.

pub mod usecases;

pub use usecases::{
    FeedOrchestrator, FeedOrchestratorError, FeedRenderError, FeedRenderer, FeedViewport,
    RenderOutcome,
};
