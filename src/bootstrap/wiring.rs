//! # Dependency Wiring / 依赖注入
//!
//! Builds the source stack for the resolved settings and hands it to a
//! [`FeedOrchestrator`]:
//!
//! ```text
//! HttpPagedQuerySource ─▶ CachedPagedQuerySource (optional) ─▶ FeedOrchestrator
//! InMemoryPagedSource  ─────────────────────────────────────▶ FeedOrchestrator
//! ```

use std::sync::Arc;
use std::time::Duration;

use pf_app::FeedOrchestrator;
use pf_core::feed::RequestContext;
use pf_core::poll::{PollListItem, PollSummary, UserActions};
use pf_core::ports::PagedQuerySourcePort;
use pf_infra::{
    CachedPagedQuerySource, HttpPagedQuerySource, HttpSourceConfig, InMemoryPagedSource,
    SystemClock,
};
use tracing::info;

use super::settings::{FeedSettings, FeedSource, REQUEST_TIMEOUT};

pub const EMPTY_MESSAGE: &str = "Polls not found.";
pub const END_MESSAGE: &str = "There are no more polls.";

const DEMO_CATEGORIES: [&str; 4] = ["technology", "sports", "food", "travel"];
const DEMO_LATENCY: Duration = Duration::from_millis(150);

pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
/// 依赖注入错误
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(String),
}

/// A wired feed. The cache handle is kept so identity changes can flush it.
pub struct FeedWiring {
    pub orchestrator: Arc<FeedOrchestrator<PollListItem>>,
    pub cache: Option<Arc<CachedPagedQuerySource<PollListItem>>>,
}

impl FeedWiring {
    /// Switches the request identity and drops pages cached for the old one.
    pub async fn set_request_context(&self, context: RequestContext) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        self.orchestrator.set_request_context(context).await;
    }
}

pub async fn wire_feed(settings: &FeedSettings) -> WiringResult<FeedWiring> {
    let wiring = match &settings.source {
        FeedSource::Http {
            base_url,
            collection,
        } => wire_http_feed(settings, base_url, collection)?,
        FeedSource::Demo { items } => wire_demo_feed(settings, *items),
    };

    let context = match &settings.auth_token {
        Some(token) => RequestContext::with_token(token.clone()),
        None => RequestContext::anonymous(),
    };
    wiring.set_request_context(context).await;
    Ok(wiring)
}

fn wire_http_feed(
    settings: &FeedSettings,
    base_url: &str,
    collection: &str,
) -> WiringResult<FeedWiring> {
    let http = HttpPagedQuerySource::<PollListItem>::new(&HttpSourceConfig {
        base_url: base_url.to_string(),
        collection: collection.to_string(),
        timeout: REQUEST_TIMEOUT,
    })
    .map_err(|e| WiringError::HttpClientInit(format!("{e:#}")))?;
    let endpoint = http.endpoint().to_string();
    info!(%endpoint, cache_ttl = ?settings.cache_ttl, "wiring HTTP poll feed");

    let http: Arc<dyn PagedQuerySourcePort<PollListItem>> = Arc::new(http);
    let (source, cache) = match settings.cache_ttl {
        Some(ttl) => {
            let cache = Arc::new(CachedPagedQuerySource::new(
                http,
                Arc::new(SystemClock),
                endpoint,
                ttl,
            ));
            let source: Arc<dyn PagedQuerySourcePort<PollListItem>> = cache.clone();
            (source, Some(cache))
        }
        None => (http, None),
    };

    Ok(FeedWiring {
        orchestrator: FeedOrchestrator::new(source, settings.page_size),
        cache,
    })
}

fn wire_demo_feed(settings: &FeedSettings, items: usize) -> FeedWiring {
    info!(items, "wiring demo poll feed");
    let source = InMemoryPagedSource::new(demo_polls(items))
        .with_empty_message(EMPTY_MESSAGE)
        .with_end_message(END_MESSAGE)
        .with_latency(DEMO_LATENCY);

    let source: Arc<dyn PagedQuerySourcePort<PollListItem>> = Arc::new(source);
    FeedWiring {
        orchestrator: FeedOrchestrator::new(source, settings.page_size),
        cache: None,
    }
}

/// Newest first, the way the API orders polls.
pub fn demo_polls(count: usize) -> Vec<PollListItem> {
    (1..=count)
        .rev()
        .map(|n| PollListItem {
            poll: PollSummary {
                id: format!("demo-{n}"),
                title: format!("Demo poll #{n}"),
                category: Some(DEMO_CATEGORIES[n % DEMO_CATEGORIES.len()].to_string()),
                user_id: Some(1),
                total_votes: (n as u64 * 7) % 23,
                extra: serde_json::Map::new(),
            },
            authenticated_user_actions: UserActions {
                has_voted: n % 3 == 0,
                ..UserActions::default()
            },
        })
        .collect()
}
