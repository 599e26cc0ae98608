//! Runtime settings resolved from the raw config, the environment and the
//! command line.
//!
//! [`FeedConfig`] carries facts; this module owns the defaults and the
//! validation.

use std::path::PathBuf;
use std::time::Duration;

use pf_core::config::FeedConfig;
use pf_core::feed::FilterParams;
use pf_core::poll::{PollFeed, DEFAULT_PAGE_SIZE};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_COLLECTION: &str = "user/polls";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// User whose polls demo mode scrolls when no feed is selected.
pub const DEMO_USER_ID: &str = "demo";

/// Environment variable overriding `[api] auth_token`.
pub const TOKEN_ENV: &str = "POLLFEED_TOKEN";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api.base_url is not set (use --demo to run without a server)")]
    MissingBaseUrl,

    #[error("api.base_url must be an http(s) URL, got `{0}`")]
    UnsupportedScheme(String),

    #[error("invalid feed `{0}`, expected <kind>:<value> such as `voted:42` or `search:rust`")]
    InvalidFeed(String),
}

/// Where pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Http {
        base_url: String,
        collection: String,
    },
    /// Generated polls served from memory.
    Demo { items: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub source: FeedSource,
    pub auth_token: Option<String>,
    pub page_size: u32,
    /// `None` parks the feed until a filter is supplied.
    pub filter: Option<FilterParams>,
    /// `None` disables the page cache.
    pub cache_ttl: Option<Duration>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl FeedSettings {
    pub fn resolve(
        config: &FeedConfig,
        env_token: Option<String>,
        demo: Option<usize>,
        feed: Option<&PollFeed>,
    ) -> Result<Self, ConfigError> {
        let source = match demo {
            Some(items) => FeedSource::Demo { items },
            None => {
                let base_url = config.api_base_url.trim();
                if base_url.is_empty() {
                    return Err(ConfigError::MissingBaseUrl);
                }
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
                }
                let collection = match (feed, config.collection.trim()) {
                    (Some(feed), _) => feed.collection().to_string(),
                    (None, "") => DEFAULT_COLLECTION.to_string(),
                    (None, collection) => collection.to_string(),
                };
                FeedSource::Http {
                    base_url: base_url.to_string(),
                    collection,
                }
            }
        };

        let filter = match feed {
            Some(feed) => Some(feed.filter()),
            None if !config.filter.is_empty() => Some(config.filter.clone()),
            None if demo.is_some() => Some(
                PollFeed::UserPolls {
                    user_id: DEMO_USER_ID.to_string(),
                }
                .filter(),
            ),
            None => None,
        };

        let auth_token = env_token
            .filter(|token| !token.trim().is_empty())
            .or_else(|| Some(config.auth_token.clone()).filter(|t| !t.trim().is_empty()));

        Ok(Self {
            source,
            auth_token,
            page_size: if config.page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                config.page_size
            },
            filter,
            cache_ttl: match (config.cache_disabled, config.cache_ttl_secs) {
                (true, _) => None,
                (false, 0) => Some(DEFAULT_CACHE_TTL),
                (false, secs) => Some(Duration::from_secs(secs)),
            },
            log_level: if config.log_level.trim().is_empty() {
                DEFAULT_LOG_LEVEL.to_string()
            } else {
                config.log_level.trim().to_string()
            },
            log_dir: Some(config.log_dir.clone()).filter(|dir| !dir.as_os_str().is_empty()),
        })
    }
}

/// Parses `<kind>:<value>`, e.g. `voted:42` or `search:rust`.
pub fn parse_feed(arg: &str) -> Result<PollFeed, ConfigError> {
    let invalid = || ConfigError::InvalidFeed(arg.to_string());
    let (kind, value) = arg.split_once(':').ok_or_else(invalid)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid());
    }
    let user_id = value.to_string();
    Ok(match kind.trim() {
        "polls" => PollFeed::UserPolls { user_id },
        "voted" => PollFeed::UserVotedPolls { user_id },
        "shared" => PollFeed::UserSharedPolls { user_id },
        "bookmarked" => PollFeed::UserBookmarkedPolls { user_id },
        "category" => PollFeed::Category { category: user_id },
        "search" => PollFeed::Search { keyword: user_id },
        _ => return Err(invalid()),
    })
}
