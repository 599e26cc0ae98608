//! Scripted scrolling over a rendered feed.
//!
//! Each rendered page occupies one row per item (at least one row). The
//! driver reads the feed page by page: it moves the viewport so its midpoint
//! sits on the top edge of the next page, reports the enter/leave transitions
//! that move causes, and waits for the window to catch up.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use pf_app::{FeedOrchestrator, FeedRenderError, FeedRenderer, FeedViewport};
use pf_core::feed::{crosses_midpoint, FeedSnapshot, PageElementId, PageNumber};
use pf_core::ports::ViewportObserverPort;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScrollError {
    #[error(transparent)]
    Render(#[from] FeedRenderError),

    #[error("feed did not settle on page {page} within {waited:?}")]
    Stalled { page: PageNumber, waited: Duration },

    #[error("feed snapshot channel closed")]
    SnapshotsClosed,
}

#[derive(Debug, Clone, Copy)]
struct PageBox {
    page: PageNumber,
    top: f64,
    bottom: f64,
}

pub struct ScrollDriver<T> {
    orchestrator: Arc<FeedOrchestrator<T>>,
    renderer: FeedRenderer<T>,
    viewport: Arc<FeedViewport>,
    forwarder: JoinHandle<()>,
    layout: Vec<PageBox>,
    in_view: BTreeSet<PageNumber>,
    scroll_top: f64,
    viewport_height: f64,
    settle_timeout: Duration,
}

impl<T> ScrollDriver<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// `viewport_height` is in item rows.
    pub fn new(
        orchestrator: Arc<FeedOrchestrator<T>>,
        renderer: FeedRenderer<T>,
        viewport_height: f64,
        settle_timeout: Duration,
    ) -> Self {
        let (viewport, forwarder) = FeedViewport::spawn(Arc::clone(&orchestrator));
        Self {
            orchestrator,
            renderer,
            viewport,
            forwarder,
            layout: Vec::new(),
            in_view: BTreeSet::new(),
            scroll_top: 0.0,
            viewport_height: viewport_height.max(1.0),
            settle_timeout,
        }
    }

    /// Reads the feed until its status is terminal, no page is left below the
    /// current one, or `max_pages` scroll steps were taken.
    pub async fn run(&mut self, max_pages: usize) -> Result<FeedSnapshot<T>, ScrollError> {
        let mut snapshot = self
            .wait_for(1, |snapshot| !snapshot.status.is_loading())
            .await?;
        let mut steps = 0;

        loop {
            self.show(&snapshot)?;
            if snapshot.status.is_terminal() {
                info!(page = snapshot.current_page, status = ?snapshot.status, "feed finished");
                break;
            }
            if steps >= max_pages {
                info!(steps, "page budget used");
                break;
            }
            let Some(next) = self.page_below(snapshot.current_page) else {
                debug!(page = snapshot.current_page, "no page below");
                break;
            };

            self.scroll_to(next);
            steps += 1;
            snapshot = self
                .wait_for(next, |snapshot| {
                    snapshot.current_page == next && !snapshot.status.is_loading()
                })
                .await?;
        }

        Ok(snapshot)
    }

    /// Renders what the snapshot adds and places the new page containers.
    fn show(&mut self, snapshot: &FeedSnapshot<T>) -> Result<(), FeedRenderError> {
        let outcome = self.renderer.render(snapshot)?;
        if outcome.cleared {
            self.layout.clear();
            self.in_view.clear();
            self.viewport.clear();
            self.scroll_top = 0.0;
        }

        for page in snapshot.pages.iter().skip(self.layout.len()) {
            let top = self.layout.last().map_or(0.0, |last| last.bottom);
            self.layout.push(PageBox {
                page: page.page,
                top,
                bottom: top + page.items.len().max(1) as f64,
            });
        }

        if outcome.cleared || self.in_view.is_empty() {
            if let Some(first) = self.layout.first().map(|b| b.page) {
                self.scroll_to(first);
            }
        } else {
            self.report_visibility();
        }
        Ok(())
    }

    fn page_below(&self, page: PageNumber) -> Option<PageNumber> {
        self.layout
            .iter()
            .skip_while(|b| b.page != page)
            .nth(1)
            .map(|b| b.page)
    }

    fn scroll_to(&mut self, page: PageNumber) {
        if let Some(target) = self.layout.iter().find(|b| b.page == page) {
            self.scroll_top = target.top - self.viewport_height / 2.0;
            debug!(page, scroll_top = self.scroll_top, "scrolled");
            self.report_visibility();
        }
    }

    /// Emits leave transitions before enter transitions.
    fn report_visibility(&mut self) {
        let now: BTreeSet<PageNumber> = self
            .layout
            .iter()
            .filter(|b| crosses_midpoint(b.top, b.bottom, self.scroll_top, self.viewport_height))
            .map(|b| b.page)
            .collect();

        for page in self.in_view.difference(&now) {
            self.viewport.on_leave_view(PageElementId(*page));
        }
        for page in now.difference(&self.in_view) {
            self.viewport.on_enter_view(PageElementId(*page));
        }
        self.in_view = now;
    }

    async fn wait_for(
        &self,
        page: PageNumber,
        predicate: impl FnMut(&FeedSnapshot<T>) -> bool,
    ) -> Result<FeedSnapshot<T>, ScrollError> {
        let mut receiver = self.orchestrator.subscribe();
        let outcome = match tokio::time::timeout(self.settle_timeout, receiver.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => Ok((*snapshot).clone()),
            Ok(Err(_)) => Err(ScrollError::SnapshotsClosed),
            Err(_) => {
                warn!(page, timeout = ?self.settle_timeout, "feed did not settle");
                Err(ScrollError::Stalled {
                    page,
                    waited: self.settle_timeout,
                })
            }
        };
        outcome
    }
}

impl<T> Drop for ScrollDriver<T> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
