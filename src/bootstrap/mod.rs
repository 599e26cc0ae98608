pub mod config;
pub mod settings;
pub mod tracing;
pub mod wiring;

pub use config::{load_config, load_or_default};
pub use settings::{parse_feed, ConfigError, FeedSettings, FeedSource};
pub use wiring::{wire_feed, FeedWiring, WiringError};
