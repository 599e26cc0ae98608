pub mod feed;
pub mod render_feed;

pub use feed::{FeedOrchestrator, FeedOrchestratorError, FeedViewport};
pub use render_feed::{FeedRenderError, FeedRenderer, RenderOutcome};
