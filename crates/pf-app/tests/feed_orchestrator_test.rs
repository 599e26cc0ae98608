use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use pf_app::{FeedOrchestrator, FeedViewport};
use pf_core::feed::{
    FeedSnapshot, FeedStatus, FetchError, FilterParams, PageElementId, PageNumber, PageQuery,
    PageResult, Paginator, RequestContext,
};
use pf_core::ports::{PagedQuerySourcePort, ViewportObserverPort};
use tokio::sync::Semaphore;

const END: &str = "There are no more polls.";
const EMPTY: &str = "Polls not found.";
const FAILURE: &str = "Something went wrong.";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Slices `items` the way the poll API does, end and empty messages included.
fn page_of(items: &[u32], page: PageNumber, page_size: u32) -> PageResult<u32> {
    let paginator = Paginator::for_page(page, items.len() as u64, page_size);
    let start = ((paginator.page - 1) * page_size) as usize;
    let end = (start + page_size as usize).min(items.len());
    let result = PageResult::new(items[start..end].to_vec(), paginator);
    if items.is_empty() {
        result.with_message(EMPTY)
    } else if !paginator.has_next {
        result.with_message(END)
    } else {
        result
    }
}

/// Source keyed by the `id` filter, with per-page failures and one-shot holds.
#[derive(Default)]
struct ScriptedSource {
    collections: HashMap<String, Vec<u32>>,
    failing: Mutex<HashSet<PageNumber>>,
    holds: Mutex<HashMap<PageNumber, Arc<Semaphore>>>,
    calls: Mutex<Vec<(String, PageNumber)>>,
}

impl ScriptedSource {
    fn with_collection(mut self, id: &str, items: impl IntoIterator<Item = u32>) -> Self {
        self.collections
            .insert(id.to_string(), items.into_iter().collect());
        self
    }

    fn fail(&self, page: PageNumber) {
        self.failing.lock().unwrap().insert(page);
    }

    fn heal(&self, page: PageNumber) {
        self.failing.lock().unwrap().remove(&page);
    }

    /// Holds the next request for `page` until the returned gate gets a permit.
    fn hold_next(&self, page: PageNumber) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.holds.lock().unwrap().insert(page, Arc::clone(&gate));
        gate
    }

    fn calls(&self) -> Vec<(String, PageNumber)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PagedQuerySourcePort<u32> for ScriptedSource {
    async fn fetch_page(
        &self,
        _context: &RequestContext,
        query: &PageQuery,
    ) -> Result<PageResult<u32>, FetchError> {
        let id = query.filter.get("id").unwrap_or_default().to_string();
        self.calls.lock().unwrap().push((id.clone(), query.page));

        let hold = self.holds.lock().unwrap().remove(&query.page);
        if let Some(gate) = hold {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        if self.failing.lock().unwrap().contains(&query.page) {
            return Err(FetchError::Server {
                status: 500,
                message: FAILURE.to_string(),
            });
        }

        let items = self.collections.get(&id).cloned().unwrap_or_default();
        Ok(page_of(&items, query.page, query.page_size))
    }
}

fn filter(id: &str) -> Option<FilterParams> {
    Some(FilterParams::new().with("id", id))
}

fn items(snapshot: &FeedSnapshot<u32>) -> Vec<u32> {
    snapshot.items().copied().collect()
}

async fn wait_until(
    orchestrator: &FeedOrchestrator<u32>,
    mut predicate: impl FnMut(&FeedSnapshot<u32>) -> bool,
) -> FeedSnapshot<u32> {
    let mut receiver = orchestrator.subscribe();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(2),
        receiver.wait_for(|snapshot| predicate(snapshot)),
    )
    .await
    .expect("feed never reached the expected state")
    .expect("snapshot channel closed");
    (*snapshot).clone()
}

async fn wait_for_discards(orchestrator: &FeedOrchestrator<u32>, count: u64) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while orchestrator.stale_discards().await < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("stale result never arrived");
}

#[tokio::test]
async fn scrolling_forward_exposes_every_item_once_and_ends() {
    init_tracing();
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=10));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    orchestrator.set_filter(filter("7")).await;
    let snapshot = wait_until(&orchestrator, |s| s.item_count() == 8).await;
    assert_eq!(items(&snapshot), (1..=8).collect::<Vec<_>>());

    orchestrator.on_visible(2).await;
    let snapshot = wait_until(&orchestrator, |s| {
        s.status == FeedStatus::end(END) && s.item_count() == 10
    })
    .await;
    assert_eq!(items(&snapshot), (1..=10).collect::<Vec<_>>());

    orchestrator.on_visible(3).await;
    let snapshot = orchestrator.settled().await.unwrap();
    assert_eq!(snapshot.current_page, 3);
    assert!(!snapshot.bounds.has_next);
    assert_eq!(snapshot.bounds.total_pages, 3);
    assert_eq!(items(&snapshot), (1..=10).collect::<Vec<_>>());
    assert_eq!(snapshot.status, FeedStatus::end(END));

    // Past the last page: nothing happens.
    let snapshot = orchestrator.on_visible(4).await;
    assert_eq!(snapshot.current_page, 3);
    assert!(source.calls().iter().all(|(_, page)| *page <= 3));
}

#[tokio::test]
async fn late_result_for_abandoned_position_is_discarded() {
    init_tracing();
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=12));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    orchestrator.set_filter(filter("7")).await;
    wait_until(&orchestrator, |s| {
        s.item_count() == 8 && !s.status.is_loading()
    })
    .await;

    let gate = source.hold_next(3);
    orchestrator.on_visible(3).await;
    orchestrator.on_visible(2).await;

    let settled = wait_until(&orchestrator, |s| {
        s.status == FeedStatus::end(END) && s.item_count() == 12
    })
    .await;
    assert_eq!(settled.current_page, 2);

    gate.add_permits(1);
    wait_for_discards(&orchestrator, 1).await;

    let snapshot = orchestrator.snapshot().await;
    assert_eq!(snapshot.revision, settled.revision);
    assert_eq!(snapshot.current_page, 2);
    assert_eq!(items(&snapshot), (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn filter_change_drops_results_of_the_old_filter() {
    init_tracing();
    let source = Arc::new(
        ScriptedSource::default()
            .with_collection("a", 1..=8)
            .with_collection("b", 101..=103),
    );
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    let gate = source.hold_next(1);
    orchestrator.set_filter(filter("a")).await;
    orchestrator.set_filter(filter("b")).await;

    let snapshot = orchestrator.settled().await.unwrap();
    assert_eq!(items(&snapshot), vec![101, 102, 103]);
    assert_eq!(snapshot.status, FeedStatus::end(END));

    gate.add_permits(1);
    wait_for_discards(&orchestrator, 1).await;

    let snapshot = orchestrator.snapshot().await;
    assert_eq!(items(&snapshot), vec![101, 102, 103]);
}

#[tokio::test]
async fn empty_collection_settles_with_empty_message() {
    let source = Arc::new(ScriptedSource::default().with_collection("7", []));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 10);

    orchestrator.set_filter(filter("7")).await;
    let snapshot = orchestrator.settled().await.unwrap();

    assert_eq!(snapshot.status, FeedStatus::empty(EMPTY));
    assert_eq!(snapshot.item_count(), 0);
    assert_eq!(source.calls(), vec![("7".to_string(), 1)]);
}

#[tokio::test]
async fn failed_page_blocks_later_pages_until_retry() {
    init_tracing();
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=12));
    source.fail(2);
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    orchestrator.set_filter(filter("7")).await;
    let snapshot = wait_until(&orchestrator, |s| {
        s.status == FeedStatus::error(FAILURE) && s.item_count() == 4
    })
    .await;
    assert_eq!(items(&snapshot), vec![1, 2, 3, 4]);

    // Page 3 resolves, page 2 does not: page 3 must stay hidden.
    orchestrator.on_visible(2).await;
    wait_until(&orchestrator, |s| s.status == FeedStatus::error(FAILURE)).await;
    tokio::time::timeout(Duration::from_secs(2), async {
        while !source.calls().contains(&("7".to_string(), 3)) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    let snapshot = orchestrator.snapshot().await;
    assert_eq!(items(&snapshot), vec![1, 2, 3, 4]);

    source.heal(2);
    orchestrator.retry().await;
    let snapshot = wait_until(&orchestrator, |s| {
        s.status == FeedStatus::end(END) && s.item_count() == 12
    })
    .await;
    assert_eq!(items(&snapshot), (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn missing_filter_keeps_the_feed_idle() {
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=4));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    orchestrator.set_filter(None).await;
    let snapshot = orchestrator.on_visible(2).await;

    assert!(snapshot.status.is_loading());
    assert_eq!(snapshot.item_count(), 0);
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn reset_rebuilds_the_window_from_page_one() {
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=12));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);

    orchestrator.set_filter(filter("7")).await;
    wait_until(&orchestrator, |s| s.item_count() == 8).await;
    orchestrator.on_visible(2).await;
    wait_until(&orchestrator, |s| s.item_count() == 12 && !s.status.is_loading()).await;

    let snapshot = orchestrator.reset().await;
    assert_eq!(snapshot.current_page, 1);
    assert_eq!(snapshot.item_count(), 0);
    assert!(snapshot.status.is_loading());

    let snapshot = wait_until(&orchestrator, |s| s.item_count() == 8).await;
    assert_eq!(snapshot.current_page, 1);
}

#[tokio::test]
async fn viewport_callbacks_move_the_window() {
    let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=12));
    let orchestrator = FeedOrchestrator::<u32>::new(source.clone(), 4);
    let (viewport, _forwarder) = FeedViewport::spawn(Arc::clone(&orchestrator));

    orchestrator.set_filter(filter("7")).await;
    wait_until(&orchestrator, |s| s.item_count() == 8).await;

    viewport.on_enter_view(PageElementId(1));
    viewport.on_enter_view(PageElementId(2));
    viewport.on_leave_view(PageElementId(1));

    let snapshot = wait_until(&orchestrator, |s| {
        s.current_page == 2 && s.status == FeedStatus::end(END)
    })
    .await;
    assert_eq!(snapshot.item_count(), 12);
}

mock! {
    Source {}

    #[async_trait]
    impl PagedQuerySourcePort<u32> for Source {
        async fn fetch_page(
            &self,
            context: &RequestContext,
            query: &PageQuery,
        ) -> Result<PageResult<u32>, FetchError>;
    }
}

#[tokio::test]
async fn request_context_is_sent_with_every_fetch() {
    let mut source = MockSource::new();
    source
        .expect_fetch_page()
        .withf(|context, query| {
            context.authorization_header().as_deref() == Some("Token abc123")
                && query.filter.get("id") == Some("7")
                && query.page == 1
                && query.page_size == 10
        })
        .times(1)
        .returning(|_, query| Ok(page_of(&[1, 2, 3], query.page, query.page_size)));
    let orchestrator = FeedOrchestrator::<u32>::new(Arc::new(source), 10);

    orchestrator
        .set_request_context(RequestContext::with_token("abc123"))
        .await;
    orchestrator.set_filter(filter("7")).await;

    let snapshot = orchestrator.settled().await.unwrap();
    assert_eq!(items(&snapshot), vec![1, 2, 3]);
    assert_eq!(snapshot.status, FeedStatus::end(END));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn published_snapshot_is_never_ahead_of_stored_state() {
    init_tracing();
    for _ in 0..50 {
        let source = Arc::new(ScriptedSource::default().with_collection("7", 1..=10));
        let orchestrator = FeedOrchestrator::<u32>::new(source, 4);
        let mut receiver = orchestrator.subscribe();

        let driver = Arc::clone(&orchestrator);
        tokio::spawn(async move { driver.set_filter(filter("7")).await });

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                receiver.changed().await.expect("snapshot channel closed");
                let (published, done) = {
                    let snapshot = receiver.borrow_and_update();
                    (
                        snapshot.revision,
                        snapshot.item_count() == 8 && !snapshot.status.is_loading(),
                    )
                };
                let stored = orchestrator.snapshot().await.revision;
                assert!(
                    stored >= published,
                    "stored revision {stored} behind published {published}"
                );
                if done {
                    break;
                }
            }
        })
        .await
        .expect("feed never settled");
    }
}
