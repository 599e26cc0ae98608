use std::sync::{Arc, Mutex, PoisonError};

use pf_core::feed::{PageElementId, PageNumber, VisibilityTracker};
use pf_core::ports::ViewportObserverPort;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::usecases::feed::FeedOrchestrator;

/// Viewport observer handed to the rendering layer.
///
/// Callbacks are synchronous and never block: the tracker decides which page
/// is dominant and the page number is queued for a single forwarding task, so
/// the orchestrator sees visibility changes in callback order.
///
/// 视口可见性回调适配器。
pub struct FeedViewport {
    tracker: Mutex<VisibilityTracker>,
    pages: mpsc::UnboundedSender<PageNumber>,
}

impl FeedViewport {
    /// Creates the observer and the task forwarding its pages to `orchestrator`.
    ///
    /// The task ends once the observer is dropped.
    pub fn spawn<T>(orchestrator: Arc<FeedOrchestrator<T>>) -> (Arc<Self>, JoinHandle<()>)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let (pages, mut receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(page) = receiver.recv().await {
                orchestrator.on_visible(page).await;
            }
            debug!("viewport observer dropped, forwarding stopped");
        });

        let viewport = Arc::new(Self {
            tracker: Mutex::new(VisibilityTracker::new()),
            pages,
        });
        (viewport, handle)
    }

    /// Forgets every tracked element, for when the rendered list is rebuilt.
    pub fn clear(&self) {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn forward(&self, page: Option<PageNumber>) {
        if let Some(page) = page {
            if self.pages.send(page).is_err() {
                debug!(page, "visibility dropped, forwarding task gone");
            }
        }
    }
}

impl ViewportObserverPort for FeedViewport {
    fn on_enter_view(&self, id: PageElementId) {
        let page = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_enter_view(id);
        self.forward(page);
    }

    fn on_leave_view(&self, id: PageElementId) {
        let page = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_leave_view(id);
        self.forward(page);
    }
}
