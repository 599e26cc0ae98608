//! Render feed use case.
//!
//! Pushes the exposed pages of successive snapshots to an [`ItemRendererPort`].
//! Pages already rendered are not rendered again; when a snapshot no longer
//! starts with the rendered pages (the feed was reset) the output is cleared
//! and rebuilt.

use std::sync::{Arc, Mutex, PoisonError};

use pf_core::feed::{FeedSnapshot, FeedStatus, PageNumber};
use pf_core::ports::ItemRendererPort;
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum FeedRenderError {
    #[error("render item {index} of page {page} failed: {source}")]
    Item {
        page: PageNumber,
        index: usize,
        source: anyhow::Error,
    },
    #[error("render status failed: {0}")]
    Status(#[source] anyhow::Error),
    #[error("clear rendered feed failed: {0}")]
    Clear(#[source] anyhow::Error),
}

/// What one `render` call added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Pages rendered by this call, in order.
    pub new_pages: Vec<PageNumber>,
    pub rendered_items: usize,
    /// The previous output was cleared first.
    pub cleared: bool,
}

struct RenderProgress<T> {
    pages: Vec<Arc<[T]>>,
    /// Page interrupted by a failed item, with the count of items drawn.
    partial: Option<(Arc<[T]>, usize)>,
    status: Option<FeedStatus>,
}

impl<T> Default for RenderProgress<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            partial: None,
            status: None,
        }
    }
}

pub struct FeedRenderer<T> {
    renderer: Arc<dyn ItemRendererPort<T>>,
    progress: Mutex<RenderProgress<T>>,
}

impl<T> FeedRenderer<T> {
    pub fn new(renderer: Arc<dyn ItemRendererPort<T>>) -> Self {
        Self {
            renderer,
            progress: Mutex::new(RenderProgress::default()),
        }
    }

    /// Number of pages rendered so far.
    pub fn rendered_pages(&self) -> usize {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pages
            .len()
    }

    #[instrument(name = "usecase.render_feed", skip_all, fields(revision = snapshot.revision))]
    pub fn render(&self, snapshot: &FeedSnapshot<T>) -> Result<RenderOutcome, FeedRenderError> {
        let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outcome = RenderOutcome::default();

        // Slot items are shared, so an unchanged page keeps its allocation.
        let still_prefix = progress.pages.len() <= snapshot.pages.len()
            && progress
                .pages
                .iter()
                .zip(snapshot.pages.iter())
                .all(|(rendered, page)| Arc::ptr_eq(rendered, &page.items));
        let partial_intact = match &progress.partial {
            Some((items, _)) => snapshot
                .pages
                .get(progress.pages.len())
                .is_some_and(|page| Arc::ptr_eq(items, &page.items)),
            None => true,
        };
        if !still_prefix || !partial_intact {
            debug!(
                rendered = progress.pages.len(),
                exposed = snapshot.pages.len(),
                "rendered pages replaced, clearing"
            );
            self.renderer.clear().map_err(FeedRenderError::Clear)?;
            *progress = RenderProgress::default();
            outcome.cleared = true;
        }

        for page in snapshot.pages.iter().skip(progress.pages.len()) {
            let resume_at = progress.partial.take().map_or(0, |(_, drawn)| drawn);
            for (index, item) in page.items.iter().enumerate().skip(resume_at) {
                if let Err(source) = self.renderer.render_item(page.page, index, item) {
                    progress.partial = Some((Arc::clone(&page.items), index));
                    return Err(FeedRenderError::Item {
                        page: page.page,
                        index,
                        source,
                    });
                }
                outcome.rendered_items += 1;
            }
            progress.pages.push(Arc::clone(&page.items));
            outcome.new_pages.push(page.page);
        }

        if progress.status.as_ref() != Some(&snapshot.status) {
            self.renderer
                .render_status(&snapshot.status)
                .map_err(FeedRenderError::Status)?;
            progress.status = Some(snapshot.status.clone());
        }

        Ok(outcome)
    }
}
