//! Feed orchestrator.
//!
//! This module runs the window state machine and executes its actions: page
//! fetches are spawned on the runtime and come back as `PageSettled` events,
//! publishes go out on a watch channel.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info, info_span, Instrument};

use pf_core::feed::{
    FeedSnapshot, FilterParams, PageNumber, PageRequest, RequestContext, WindowAction,
    WindowEvent, WindowPhase, WindowState, WindowStateMachine,
};
use pf_core::ports::PagedQuerySourcePort;

use crate::usecases::feed::context::FeedContext;

/// Errors produced by the feed orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum FeedOrchestratorError {
    #[error("feed snapshot channel closed")]
    SnapshotChannelClosed,
}

/// Orchestrator that drives one feed's window state and its page fetches.
///
/// One instance per list view. Events are applied one at a time under the
/// dispatch lock; fetch results re-enter through the same path.
pub struct FeedOrchestrator<T> {
    context: Arc<FeedContext<T>>,
    source: Arc<dyn PagedQuerySourcePort<T>>,
    request_context: RwLock<RequestContext>,
    snapshots: watch::Sender<FeedSnapshot<T>>,
}

impl<T> FeedOrchestrator<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn PagedQuerySourcePort<T>>, page_size: u32) -> Arc<Self> {
        let (snapshots, _) = watch::channel(FeedSnapshot::empty());
        Arc::new(Self {
            context: FeedContext::new(WindowState::new(page_size)).arc(),
            source,
            request_context: RwLock::new(RequestContext::anonymous()),
            snapshots,
        })
    }

    /// Selects the collection to page. `None` parks the feed until a filter
    /// arrives; an equal filter is ignored.
    pub async fn set_filter(self: &Arc<Self>, filter: Option<FilterParams>) -> FeedSnapshot<T> {
        self.dispatch(WindowEvent::FilterChanged(filter)).await
    }

    pub async fn reset(self: &Arc<Self>) -> FeedSnapshot<T> {
        self.dispatch(WindowEvent::Reset).await
    }

    /// The container of `page` became dominant in the viewport.
    pub async fn on_visible(self: &Arc<Self>, page: PageNumber) -> FeedSnapshot<T> {
        self.dispatch(WindowEvent::Visible { page }).await
    }

    pub async fn retry(self: &Arc<Self>) -> FeedSnapshot<T> {
        self.dispatch(WindowEvent::Retry).await
    }

    /// Context sent with every fetch issued from now on. The window is kept.
    pub async fn set_request_context(&self, context: RequestContext) {
        *self.request_context.write().await = context;
    }

    pub async fn snapshot(&self) -> FeedSnapshot<T> {
        self.context.snapshot().await
    }

    /// Page results dropped because their window position was abandoned.
    pub async fn stale_discards(&self) -> u64 {
        self.context.stale_discards().await
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot<T>> {
        self.snapshots.subscribe()
    }

    /// Waits until the published status stops loading and returns that snapshot.
    pub async fn settled(&self) -> Result<FeedSnapshot<T>, FeedOrchestratorError> {
        let mut receiver = self.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| !snapshot.status.is_loading())
            .await
            .map_err(|_| FeedOrchestratorError::SnapshotChannelClosed)?;
        Ok((*snapshot).clone())
    }

    async fn dispatch(self: &Arc<Self>, event: WindowEvent<T>) -> FeedSnapshot<T> {
        // Serialize dispatches so each transition sees the state the previous
        // one left behind.
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;

        let span = info_span!(
            "usecase.feed_orchestrator.dispatch",
            event = event_name(&event)
        );
        async {
            let current = self.context.get_state().await;
            let from = phase_label(current.phase());
            let from_page = current.current_page();

            let (next, actions) = WindowStateMachine::transition(current, event);

            let to = phase_label(next.phase());
            if from != to || from_page != next.current_page() {
                info!(
                    from = %from,
                    to = %to,
                    page = next.current_page(),
                    status = ?next.status(),
                    "feed state transition"
                );
            }

            let request_context = self.request_context.read().await.clone();
            let snapshot = next.snapshot();
            let mut publish = false;
            for action in actions {
                debug!(?action, "feed executing action");
                match action {
                    WindowAction::FetchPage(request) => {
                        self.spawn_fetch(request, request_context.clone());
                    }
                    WindowAction::Publish => publish = true,
                }
            }

            // Store before publishing so subscribers never read an older state.
            self.context.set_state(next).await;
            if publish {
                self.snapshots.send_replace(snapshot.clone());
            }
            snapshot
        }
        .instrument(span)
        .await
    }

    fn spawn_fetch(self: &Arc<Self>, request: PageRequest, context: RequestContext) {
        let this = Arc::clone(self);
        let span = info_span!(
            "usecase.feed_orchestrator.fetch",
            tag = %request.tag,
            page = request.query.page
        );
        tokio::spawn(
            async move {
                let outcome = this.source.fetch_page(&context, &request.query).await;
                this.dispatch(WindowEvent::PageSettled {
                    tag: request.tag,
                    slot: request.slot,
                    page: request.query.page,
                    outcome,
                })
                .await;
            }
            .instrument(span),
        );
    }
}

fn event_name<T>(event: &WindowEvent<T>) -> &'static str {
    match event {
        WindowEvent::FilterChanged(_) => "filter_changed",
        WindowEvent::Reset => "reset",
        WindowEvent::Visible { .. } => "visible",
        WindowEvent::PageSettled { .. } => "page_settled",
        WindowEvent::Retry => "retry",
    }
}

fn phase_label<T>(phase: &WindowPhase<T>) -> String {
    match phase {
        WindowPhase::Idle => "idle".to_string(),
        WindowPhase::AwaitingWindow { tag, .. } => format!("awaiting({tag})"),
        WindowPhase::Merged { tag } => format!("merged({tag})"),
    }
}
